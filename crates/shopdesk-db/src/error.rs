//! # Database Error Types
//!
//! Error types for database operations and for the sale engine boundary.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleError ← DbError | CoreError, what SaleEngine callers see          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Forms/views layer shows `to_string()`, branches on `kind()`           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shopdesk_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate customer phone or product barcode
    /// - Duplicate document number / (kind, sequence)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Item referencing a non-existent product
    /// - Invoice referencing a non-existent customer
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. stock below zero).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Another connection holds the write lock past the busy timeout.
    #[error("Database is busy")]
    Busy,

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a UNIQUE violation hit the given `table.column` (or prefix).
    pub fn is_unique_violation_on(&self, target: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(target))
    }

    /// Transient failures where the same request can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                // "database is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Sale Error
// =============================================================================

/// Everything a `SaleEngine` operation can fail with.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for SaleError {
    fn from(err: ValidationError) -> Self {
        SaleError::Core(CoreError::Validation(err))
    }
}

impl SaleError {
    /// Classifies the error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::Core(e) => e.kind(),
            SaleError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            SaleError::Db(DbError::UniqueViolation { .. }) => ErrorKind::Conflict,
            SaleError::Db(_) => ErrorKind::Storage,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SaleError::Core(e) => e.is_retryable(),
            SaleError::Db(e) => e.is_retryable(),
        }
    }
}

/// Result type for engine operations.
pub type SaleResult<T> = Result<T, SaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_target() {
        let err = DbError::duplicate("documents.kind, documents.sequence", "pos/1");
        assert!(err.is_unique_violation_on("documents."));
        assert!(!err.is_unique_violation_on("customers.phone"));
    }

    #[test]
    fn test_sale_error_kind() {
        let not_found: SaleError = DbError::not_found("Document", "x").into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let busy: SaleError = DbError::Busy.into();
        assert_eq!(busy.kind(), ErrorKind::Storage);
        assert!(busy.is_retryable());

        let empty: SaleError = CoreError::EmptySale {
            number: "POS-001".to_string(),
        }
        .into();
        assert_eq!(empty.kind(), ErrorKind::EmptySale);
        assert!(!empty.is_retryable());
    }
}
