//! # Database Error Types
//!
//! Error handling for all database operations.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DbError Variants                                 │
//! │                                                                         │
//! │  Data errors (caller can act on these)                                 │
//! │  ├── NotFound            - row lookup came back empty                  │
//! │  ├── UniqueViolation     - duplicate key / duplicate CPF-CNPJ          │
//! │  ├── ForeignKeyViolation - dangling reference                          │
//! │  └── InsufficientStock   - conditional stock decrement matched 0 rows  │
//! │                                                                         │
//! │  Input errors                                                          │
//! │  └── Validation          - balcao-core rule rejected the write         │
//! │                                                                         │
//! │  Infrastructure errors (usually not recoverable by the caller)        │
//! │  ├── ConnectionFailed / UnsupportedBackend / SchemaSetupFailed        │
//! │  └── QueryFailed / Decode / Internal                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `From<sqlx::Error>` impl classifies driver errors by the database's
//! own message text, since the Any driver erases the engine-specific error
//! types. Both engines' unique/foreign-key phrasings are recognized.

use balcao_core::ValidationError;
use thiserror::Error;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row not found by its key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (duplicate primary key or tax id).
    #[error("duplicate {field}: {value}")]
    UniqueViolation { field: &'static str, value: String },

    /// Foreign key constraint violation.
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The conditional stock decrement matched no row: the product either
    /// does not exist or does not hold enough stock.
    #[error("insufficient stock for {codigo}: {available} available, {requested} requested")]
    InsufficientStock {
        codigo: String,
        available: i64,
        requested: i64,
    },

    /// A balcao-core business rule rejected the write before it reached SQL.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Could not connect to the database.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection URL names an engine this layer does not support.
    #[error("unsupported database backend in url: {0}")]
    UnsupportedBackend(String),

    /// Startup DDL failed.
    #[error("schema setup failed: {0}")]
    SchemaSetupFailed(String),

    /// A query failed for a reason other than the classified ones above.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A fetched row could not be converted to the expected shape.
    #[error("row decode failed: {0}")]
    Decode(String),

    /// Invariant violation inside this crate.
    #[error("internal database error: {0}")]
    Internal(String),
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Shorthand for a [`DbError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`DbError::UniqueViolation`].
    pub fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field,
            value: value.into(),
        }
    }

    /// Whether this error means "the row you asked for is not there",
    /// as opposed to an infrastructure failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

// =============================================================================
// sqlx Error Classification
// =============================================================================

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("row", "<unknown>"),
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("connection pool timed out".to_string())
            }
            sqlx::Error::Database(db_err) => classify_database_error(db_err.message()),
            sqlx::Error::Io(io_err) => DbError::ConnectionFailed(io_err.to_string()),
            sqlx::Error::Configuration(cfg_err) => DbError::ConnectionFailed(cfg_err.to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

/// Maps an engine error message to a classified variant.
///
/// SQLite reports `UNIQUE constraint failed: products.CODIGO`; PostgreSQL
/// reports `duplicate key value violates unique constraint "products_pkey"`.
fn classify_database_error(message: &str) -> DbError {
    let lower = message.to_lowercase();

    if lower.contains("unique constraint") || lower.contains("duplicate key") {
        return DbError::UniqueViolation {
            field: "key",
            value: message.to_string(),
        };
    }

    if lower.contains("foreign key") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }

    DbError::QueryFailed(message.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_sqlite_unique_violation() {
        let err = classify_database_error("UNIQUE constraint failed: products.CODIGO");
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[test]
    fn test_classifies_postgres_unique_violation() {
        let err =
            classify_database_error("duplicate key value violates unique constraint \"products_pkey\"");
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[test]
    fn test_classifies_foreign_key_violation() {
        let err = classify_database_error("FOREIGN KEY constraint failed");
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let err = classify_database_error(
            "insert or update on table \"sales_items\" violates foreign key constraint",
        );
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[test]
    fn test_unclassified_falls_back_to_query_failed() {
        let err = classify_database_error("syntax error near SELECT");
        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = DbError::not_found("product", "ABR01");
        assert_eq!(err.to_string(), "product not found: ABR01");
        assert!(err.is_not_found());

        let err = DbError::InsufficientStock {
            codigo: "ABR01".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for ABR01: 2 available, 5 requested"
        );
    }
}
