use thiserror::Error;

/// Why a poll produced no sample
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection refused, unreachable host, timeout, truncated body
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but not a telemetry object
    #[error("Unexpected payload: {0}")]
    Shape(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::HttpStatus(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}
