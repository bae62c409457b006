//! Application layer errors

use thiserror::Error;

/// Outcomes of room operations that are not `Accepted`
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Participant already exists: {0}")]
    AlreadyExists(String),

    #[error("Participant not found: {0}")]
    NotFound(String),

    #[error("Invalid participant name: {0:?}")]
    InvalidName(String),

    /// A message names a participant who is not registered
    #[error("Not a registered participant: {0}")]
    UnknownSender(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

impl ChatError {
    /// Storage failures are transient; the rest are business outcomes.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::StorageUnavailable(_))
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors raised while reading console input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}
