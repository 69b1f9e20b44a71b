//! # Error Types
//!
//! Validation error types for balcao-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  balcao-core errors (this file)                                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  balcao-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  balcao-service errors (separate crate)                                │
//! │  └── ServiceError     - What callers of the coordinator see            │
//! │                                                                         │
//! │  Flow: ValidationError ──┐                                             │
//! │        DbError ──────────┴──► ServiceError ──► Caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, value, allowed set)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur before any write is attempted: the coordinator and the
/// entity repositories validate with these rules first, so a failed
/// validation never leaves a side effect in the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A field must be empty for the given client type but was provided.
    ///
    /// ## When This Occurs
    /// - `IDADE` or `GENERO` set on an `empresa` client
    #[error("{field} must be empty for {tipo} clients")]
    MustBeEmpty { field: &'static str, tipo: &'static str },

    /// Numeric value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    /// Numeric value must not be negative.
    #[error("{field} cannot be negative")]
    CannotBeNegative { field: &'static str },

    /// Invalid format (e.g. an unparsable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    /// Value is not in the allowed set (payment method, client type,
    /// age bracket).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed {
        field: &'static str,
        allowed: Vec<&'static str>,
    },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required { field: "CODIGO" };
        assert_eq!(err.to_string(), "CODIGO is required");

        let err = ValidationError::MustBeEmpty {
            field: "IDADE",
            tipo: "empresa",
        };
        assert_eq!(err.to_string(), "IDADE must be empty for empresa clients");

        let err = ValidationError::MustBePositive { field: "QUANTIDADE" };
        assert_eq!(err.to_string(), "QUANTIDADE must be greater than zero");
    }
}
