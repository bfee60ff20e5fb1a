use thiserror::Error;

/// SQLSTATE reported by serializable backends when a transaction lost a
/// contention race and must be replayed.
pub const SERIALIZATION_FAILURE: &str = "40001";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// Error reported by the database itself, tagged with its SQLSTATE code.
    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction has already been committed or rolled back")]
    TxDone,

    #[error("Context canceled")]
    Canceled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<DbError> },

    #[error("Restarting transaction failed: {restart}; original error: {cause}")]
    RestartFailed {
        restart: Box<DbError>,
        cause: Box<DbError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl DbError {
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for the backend's "restart transaction" signal.
    pub fn serialization_failure(message: impl Into<String>) -> Self {
        Self::database(SERIALIZATION_FAILURE, message)
    }

    /// SQLSTATE of a database error, if this is one.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
