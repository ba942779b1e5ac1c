use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSortError {
    #[error("unknown sort key: {0:?}")]
    UnknownKey(String),
    #[error("unknown sort direction: {0:?}")]
    UnknownDirection(String),
}
