use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::WorkflowError;
use super::plan::StateKey;

/// Run-scoped, write-once map of committed phase outputs
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    entries: BTreeMap<StateKey, Value>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StateKey) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Commit `value` under `key`; a key can only be committed once
    pub fn commit(&mut self, key: StateKey, value: Value) -> Result<(), WorkflowError> {
        if self.entries.contains_key(&key) {
            return Err(WorkflowError::DuplicateKey(key));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lifecycle status of a run
///
/// # Status Transitions
/// ```text
/// Created -> Running -> Running ... -> Completed
///                 └----------------------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// `Running -> Running` is the move from one phase to the next.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Created, Running) | (Running, Running) | (Running, Completed) | (Running, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Created => write!(f, "created"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One end-to-end execution of the workflow for a single prompt
///
/// # Invariants
/// - Phases start in order, one after another, beginning at 1
/// - Once `Completed` or `Failed` the run never changes status again
/// - Workflow state keys are committed at most once
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    run_id: String,
    status: RunStatus,
    current_phase: u8,
    failed_phase: Option<u8>,
    state: WorkflowState,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Create a run seeded with the user's prompt
    pub fn new(run_id: impl Into<String>, prompt: &str) -> Self {
        let mut state = WorkflowState::new();
        state
            .entries
            .insert(StateKey::Prompt, Value::String(prompt.to_string()));

        Self {
            run_id: run_id.into(),
            status: RunStatus::Created,
            current_phase: 0,
            failed_phase: None,
            state,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Enter the next phase
    pub fn begin_phase(&mut self, phase: u8) -> Result<(), WorkflowError> {
        if phase != self.current_phase.saturating_add(1) {
            return Err(WorkflowError::InvalidPlan(format!(
                "phase {phase} cannot follow phase {}",
                self.current_phase
            )));
        }
        self.transition(RunStatus::Running)?;
        self.current_phase = phase;
        Ok(())
    }

    pub fn commit(&mut self, key: StateKey, value: Value) -> Result<(), WorkflowError> {
        self.state.commit(key, value)
    }

    pub fn complete(&mut self) -> Result<(), WorkflowError> {
        self.transition(RunStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the current phase as failed
    pub fn fail(&mut self) -> Result<(), WorkflowError> {
        self.transition(RunStatus::Failed)?;
        self.failed_phase = Some(self.current_phase);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    // ===== Getters =====

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn current_phase(&self) -> u8 {
        self.current_phase
    }

    pub fn failed_phase(&self) -> Option<u8> {
        self.failed_phase
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
