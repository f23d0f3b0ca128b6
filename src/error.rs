//! Unified error hierarchy for riskrs
//!
//! Missing or degenerate input never shows up here: metrics that cannot be
//! computed are carried as `None` or sentinel values. The errors below cover
//! unknown records, collaborator failures and configuration problems.

use thiserror::Error;

/// Top-level error type for all riskrs operations
#[derive(Debug, Error)]
pub enum RiskError {
    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The time-series collaborator failed to answer a query
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    /// SQLite storage errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors (JSON datasets, CSV export)
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by a [`TimeSeriesLoader`](crate::loader::TimeSeriesLoader)
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Query could not be executed
    #[error("Query failed for {query}: {reason}")]
    QueryFailed { query: String, reason: String },

    /// Backend is unavailable (poisoned lock, closed connection)
    #[error("Loader unavailable: {reason}")]
    Unavailable { reason: String },

    /// Stored data could not be decoded into a record
    #[error("Malformed record in {table}: {reason}")]
    Malformed { table: String, reason: String },
}

/// SQLite operation errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema initialization failed: {reason}")]
    Schema { reason: String },

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Result type alias for riskrs operations
pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
    /// Shorthand for a not-found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        RiskError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RiskError::Loader(LoaderError::Unavailable { .. }) | RiskError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RiskError::NotFound { .. } => ErrorSeverity::Warning,
            RiskError::Validation(_) => ErrorSeverity::Warning,
            RiskError::Loader(LoaderError::Unavailable { .. }) => ErrorSeverity::Error,
            RiskError::Loader(_) => ErrorSeverity::Error,
            RiskError::Database(_) => ErrorSeverity::Error,
            RiskError::Configuration(_) => ErrorSeverity::Error,
            RiskError::Serialization(_) => ErrorSeverity::Error,
            RiskError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RiskError::NotFound { entity, id } => {
                format!("No {} with id {} exists in the data source.", entity.to_lowercase(), id)
            }
            RiskError::Loader(LoaderError::Unavailable { .. }) => {
                "The data source is unavailable. Please check the dataset or database path."
                    .to_string()
            }
            RiskError::Configuration(reason) => {
                format!("Invalid configuration: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for RiskError {
    fn from(err: csv::Error) -> Self {
        RiskError::Serialization(err.to_string())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
