use thiserror::Error;

/// Store-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A document with the same id already exists.
    #[error("duplicate document id: {0}")]
    Duplicate(String),

    /// Backend failure (lost connection, poisoned state, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}
