use thiserror::Error;

/// Failures of the generation service call itself
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service returned no content")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}
