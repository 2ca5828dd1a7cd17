use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API returned unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}
