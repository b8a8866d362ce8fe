use parley_shared::validation::ChatValidationError;
use parley_shared::{ChatId, MessageId, ProtocolError};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chat {0} not found")]
    ChatNotFound(ChatId),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored payload is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored payload decoded to an invalid domain value.
    #[error("Payload error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A write was refused because the data is structurally invalid.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<ChatValidationError> for StoreError {
    fn from(e: ChatValidationError) -> Self {
        Self::InvalidData(e.to_string())
    }
}

/// What a caller of the local store can be told about a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocalStorageError {
    #[error("local storage is temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("local storage is full")]
    StorageFull,
    #[error("local storage is corrupted")]
    Corrupted,
    #[error("local storage is read-only")]
    ReadOnly,
    #[error("access to local storage was denied")]
    AccessDenied,
    #[error("local storage error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Project into the caller-facing taxonomy.
    pub fn kind(&self) -> LocalStorageError {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => match e.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    LocalStorageError::TemporarilyUnavailable
                }
                ErrorCode::DiskFull => LocalStorageError::StorageFull,
                ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                    LocalStorageError::Corrupted
                }
                ErrorCode::ReadOnly => LocalStorageError::ReadOnly,
                ErrorCode::PermissionDenied | ErrorCode::CannotOpen => {
                    LocalStorageError::AccessDenied
                }
                _ => LocalStorageError::Unknown(self.to_string()),
            },
            Self::Sqlite(rusqlite::Error::FromSqlConversionFailure(..))
            | Self::Json(_)
            | Self::Protocol(_)
            | Self::Migration(_) => LocalStorageError::Corrupted,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::PermissionDenied => LocalStorageError::AccessDenied,
                _ => LocalStorageError::Unknown(e.to_string()),
            },
            Self::NoDataDir => LocalStorageError::AccessDenied,
            other => LocalStorageError::Unknown(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
