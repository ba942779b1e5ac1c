use thiserror::Error;

/// Failure of a whole-dataset fetch. Individual malformed records never end
/// up here; they are repaired during normalization.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch countries (HTTP {status})")]
    Http { status: u16 },
    #[error("country fetch was cancelled")]
    Cancelled,
    #[error("failed to reach countries endpoint: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode countries response: {0}")]
    Decode(#[source] reqwest::Error),
    /// Failure reported by a non-HTTP source.
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Cancellation means the lifecycle was superseded, not that anything broke.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}
