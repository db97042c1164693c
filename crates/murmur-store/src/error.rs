use murmur_shared::CodecError;
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

    /// A stored event or resend record could not be encoded / decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// An index entry does not hold an 8-byte timestamp.
    #[error("Corrupt entry in {bucket}: expected 8-byte timestamp, got {len} bytes")]
    CorruptIndex { bucket: &'static str, len: usize },

    /// A write was attempted inside a read transaction.
    #[error("Write attempted in read-only transaction on {0}")]
    ReadOnly(&'static str),

    /// Another thread panicked while holding the connection.
    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
