//! Error taxonomy for the save-protocol core (spec §7).
use thiserror::Error;

/// Failures raised by a [`crate::storage::Storage`] implementation.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("(de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "sqlite-storage")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("account record corrupt for {email}: {reason}")]
    CorruptRecord { email: String, reason: String },
}

/// Top-level dispatch failure. Every variant maps to one `Result=Failure&Reason=...`
/// response per spec §7; none of these are allowed to escape the dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown or malformed action")]
    Transport,

    #[error("password did not match")]
    Auth,

    #[error("account not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl DispatchError {
    /// The `Reason` value written into the response for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            DispatchError::Transport => "UnknownAction",
            DispatchError::Auth => "WrongPass",
            DispatchError::NotFound => "NotFound",
            DispatchError::Storage(_) => "StorageError",
        }
    }
}
