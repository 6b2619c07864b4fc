use thiserror::Error;

/// Error surfaced to the consumer's commit boundary for a single message.
///
/// The split matters: an invalid event will never become valid on
/// redelivery, while a store error is expected to clear once connectivity
/// returns, so only the latter may block the offset commit.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid event payload: {0}")]
    InvalidEvent(String),
    #[error("store error: {0}")]
    Store(String),
}

impl DomainError {
    /// Whether redelivering the message could produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Store(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Store(err.to_string())
    }
}
