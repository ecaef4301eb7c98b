use thiserror::Error;

use crate::llm::GenerationError;

/// Conditions that prevent an agent from producing any result
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("agent task did not finish: {0}")]
    Join(String),
}
