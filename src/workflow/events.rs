// Progress notifications emitted while a run executes
//
// Notifications for a run are emitted by a single task in plan order: a
// phase's start, then its per-agent results, then its completion or failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::types::AgentRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PhaseStarted,
    AgentCompleted,
    AgentFailed,
    PhaseCompleted,
    PhaseFailed,
    RunCompleted,
}

/// A progress event for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub run_id: String,
    pub phase: u8,
    pub kind: NotificationKind,
    pub message: String,
    pub role: Option<AgentRole>,
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        run_id: impl Into<String>,
        phase: u8,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            phase,
            kind,
            message: message.into(),
            role: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn phase_started(run_id: &str, phase: u8, name: &str) -> Self {
        Self::new(
            run_id,
            phase,
            NotificationKind::PhaseStarted,
            format!("Phase {phase}: {name} started"),
        )
    }

    pub fn phase_completed(run_id: &str, phase: u8, name: &str) -> Self {
        Self::new(
            run_id,
            phase,
            NotificationKind::PhaseCompleted,
            format!("Phase {phase}: {name} complete"),
        )
    }

    pub fn phase_failed(run_id: &str, phase: u8, name: &str, cause: &str) -> Self {
        Self::new(
            run_id,
            phase,
            NotificationKind::PhaseFailed,
            format!("Phase {phase}: {name} failed: {cause}"),
        )
    }

    /// True for the notifications that end a phase
    pub fn is_phase_end(&self) -> bool {
        matches!(
            self.kind,
            NotificationKind::PhaseCompleted | NotificationKind::PhaseFailed
        )
    }
}
