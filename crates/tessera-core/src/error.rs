//! Error types for Tessera

use thiserror::Error;

/// Core error type for Tessera operations
#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Mutation not allowed on a read-only connection: {0}")]
    ReadOnlyViolation(String),

    #[error("Table '{table}' has no primary key; rows cannot be targeted for update or delete")]
    MissingPrimaryKey { table: String },

    #[error("Invalid change: {0}")]
    InvalidChange(String),

    #[error("A commit is already in progress on this connection")]
    CommitInProgress,

    /// The statement batch failed and the rollback that followed failed too.
    #[error("{source}; rollback also failed: {rollback}")]
    RollbackFailed {
        #[source]
        source: Box<TesseraError>,
        rollback: Box<TesseraError>,
    },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl TesseraError {
    /// Join a failed rollback onto the error that triggered it.
    pub fn with_rollback_failure(self, rollback: TesseraError) -> Self {
        TesseraError::RollbackFailed {
            source: Box::new(self),
            rollback: Box::new(rollback),
        }
    }

    /// True for errors raised before anything was sent to the backend.
    pub fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            TesseraError::ReadOnlyViolation(_)
                | TesseraError::MissingPrimaryKey { .. }
                | TesseraError::InvalidChange(_)
                | TesseraError::CommitInProgress
                | TesseraError::UnsupportedDriver(_)
        )
    }
}

/// Result type alias for Tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;
