use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("ANTHROPIC_API_KEY not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Claude API error: {0}")]
    Api(String),

    #[error("Response contained no text content")]
    EmptyResponse,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClaudeResult<T> = Result<T, ClaudeError>;
