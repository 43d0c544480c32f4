//! Hand-off delivery errors. Every variant means the agent did not take
//! ownership, so the native download is left to the browser.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandoffError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("{0}")]
    Curl(curl::Error),
    /// No complete response within the configured timeout.
    #[error("hand-off timed out")]
    Timeout,
    /// The agent answered with a non-2xx status.
    #[error("agent returned HTTP {0}")]
    Http(u32),
    #[error("serialize descriptor: {0}")]
    Encode(#[from] serde_json::Error),
    /// The blocking transfer task panicked or was cancelled.
    #[error("hand-off worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<curl::Error> for HandoffError {
    fn from(e: curl::Error) -> Self {
        if e.is_operation_timedout() {
            HandoffError::Timeout
        } else {
            HandoffError::Curl(e)
        }
    }
}

impl HandoffError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HandoffError::Timeout)
    }
}
