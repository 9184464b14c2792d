//! Error types for chime-core

use thiserror::Error;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chime-core
#[derive(Error, Debug)]
pub enum Error {
    /// Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Wall clock could not produce the current time
    #[error("clock unavailable: {0}")]
    Clock(String),

    /// A scheduled-time string could not be parsed or formatted
    #[error("invalid scheduled time: {0}")]
    InvalidTime(String),

    /// Logging initialization errors
    #[error("logging error: {0}")]
    Logging(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-layer error type.
///
/// `DuplicateToken` and `MissingToken` are contract violations surfaced by
/// `store`/`modify`; everything else maps onto `Database`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no database found at {path}")]
    NotFound { path: String },

    #[error("database is not open")]
    NotOpen,

    #[error("an alert with token {token} is already persisted")]
    DuplicateToken { token: String },

    #[error("no persisted alert for token {token}")]
    MissingToken { token: String },

    #[error("corrupt alert row for token {token}: {reason}")]
    CorruptRow { token: String, reason: String },

    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_wraps_into_error() {
        let err: Error = StorageError::NotOpen.into();
        assert!(matches!(err, Error::Storage(StorageError::NotOpen)));
    }

    #[test]
    fn error_messages_are_stable() {
        let err = StorageError::DuplicateToken {
            token: "tok-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "an alert with token tok-1 is already persisted"
        );
    }
}
