use std::time::Duration;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Link is closed")]
    LinkClosed,

    #[error("Link was already closed")]
    LinkAlreadyClosed,

    #[error("Exchange task failed: {0}")]
    Exchange(String),

    #[error("Exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<tokio::task::JoinError> for HarnessError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            HarnessError::Exchange("background task panicked".to_string())
        } else {
            HarnessError::Exchange("background task was cancelled".to_string())
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
