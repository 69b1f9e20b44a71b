//! # Service Error Types
//!
//! What callers of the coordinator see. Validation and database errors
//! convert in via `#[from]`; the lookup and stock failures get their own
//! variants because the caller routes on them (retry, pick another
//! product, top up stock).

use thiserror::Error;

use balcao_core::ValidationError;
use balcao_db::DbError;

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed a business rule before any write was attempted.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The referenced client does not exist.
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// The referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// The referenced sale does not exist.
    #[error("sale not found: {0}")]
    SaleNotFound(String),

    /// Not enough stock to cover the requested quantity.
    #[error("insufficient stock for {produto}: {available} available, {requested} requested")]
    InsufficientStock {
        produto: String,
        available: i64,
        requested: i64,
    },

    /// A database operation failed.
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let validation = ValidationError::Required { field: "CODIGO" };
        let err: ServiceError = validation.into();
        assert!(matches!(err, ServiceError::Validation(_)));

        let db = DbError::not_found("product", "ABR01");
        let err: ServiceError = db.into();
        assert!(matches!(err, ServiceError::Db(_)));
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = ServiceError::InsufficientStock {
            produto: "Vela Aromática".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Vela Aromática: 2 available, 5 requested"
        );
    }
}
