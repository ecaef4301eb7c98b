use thiserror::Error;

use super::plan::StateKey;
use super::state::RunStatus;
use crate::agents::types::AgentRole;

/// Errors raised by plan validation and workflow execution
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow state key already committed: {0}")]
    DuplicateKey(StateKey),

    #[error("phase {phase} reads {key} before it is committed")]
    PlanValidity { phase: u8, key: StateKey },

    #[error("phase {phase} writes {key}, which is already produced earlier in the plan")]
    DuplicateOutput { phase: u8, key: StateKey },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("no agent registered for role {0}")]
    AgentNotFound(AgentRole),

    #[error("phase {phase} failed: {role} agent: {cause}")]
    PhaseFailed {
        phase: u8,
        role: AgentRole,
        cause: String,
    },

    #[error("invalid run state transition from {from} to {to}")]
    InvalidStateTransition { from: RunStatus, to: RunStatus },

    #[error("workflow finished without committing {0}")]
    MissingOutput(StateKey),
}

impl WorkflowError {
    /// Phase number for errors raised by a failed phase
    pub fn failed_phase(&self) -> Option<u8> {
        match self {
            WorkflowError::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
