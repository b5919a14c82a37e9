//! Error types for beaker-db

use thiserror::Error;

/// Result type alias for beaker-db operations
pub type DbResult<T> = Result<T, DbError>;

/// Boxed driver-level error carried by [`DbError::Execution`].
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum DbError {
    /// A terminal operation ran before `table(...)` was called
    #[error("no table has been set on the query builder")]
    MissingTable,

    /// `insert`/`update` called with no fields
    #[error("{0} requires at least one field")]
    EmptyPayload(&'static str),

    /// A condition group was rendered with no children
    #[error("condition group has no conditions")]
    MissingCondition,

    /// A schema override was supplied without a caller-owned transaction
    #[error("schema must be set per transaction: {0}")]
    InvalidSchemaUsage(String),

    /// The query builder was given both or neither of transaction/provider
    #[error("query builder needs exactly one of a transaction or a connection provider ({0})")]
    DualBinding(&'static str),

    /// Statement execution failed in the driver
    #[error("Execution error: {0}")]
    Execution(#[source] DriverError),

    /// Could not obtain a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// A failed unit of work whose rollback or release failed as well
    #[error("{source} (closing the transaction also failed: {close})")]
    CloseFailed {
        #[source]
        source: Box<DbError>,
        close: Box<DbError>,
    },
}

impl DbError {
    /// Wrap a driver error as an execution failure
    pub fn execution(err: impl Into<DriverError>) -> Self {
        Self::Execution(err.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Keep `close` alongside the error that caused the close
    pub fn with_close_failure(self, close: DbError) -> Self {
        Self::CloseFailed {
            source: Box::new(self),
            close: Box::new(close),
        }
    }

    /// Check if this is a driver execution error
    pub fn is_execution(&self) -> bool {
        match self {
            Self::Execution(_) => true,
            Self::CloseFailed { source, .. } => source.is_execution(),
            _ => false,
        }
    }

    /// SQLSTATE code of the underlying database error, if any
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Execution(err) => err
                .downcast_ref::<postgres::Error>()
                .and_then(|e| e.code())
                .map(|c| c.code()),
            Self::CloseFailed { source, .. } => source.sqlstate(),
            _ => None,
        }
    }
}

impl From<postgres::Error> for DbError {
    fn from(err: postgres::Error) -> Self {
        Self::Execution(Box::new(err))
    }
}
