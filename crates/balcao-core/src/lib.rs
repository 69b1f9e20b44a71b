//! # balcao-core: Pure Business Logic for Balcão
//!
//! This crate is the **heart** of Balcão. It contains the domain types and
//! business rules of the sale pipeline as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Balcão Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI / CLI / Export layers (external)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 balcao-service (SaleService)                    │   │
//! │  │       register_sale, cancel_sale — one transaction each         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ balcao-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ validation│  │    ids    │  │   error   │  │   │
//! │  │   │  Product  │  │   rules   │  │  CLI001   │  │ Validation│  │   │
//! │  │   │   Sale    │  │  checks   │  │  VND001   │  │   Error   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 balcao-db (Database Layer)                      │   │
//! │  │        dialect seam, repositories, SQLite + PostgreSQL          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Client, Sale, SaleItem, enums)
//! - [`validation`] - Business rule validation
//! - [`ids`] - Sequential human-readable id derivation (CLI001, VND001)
//! - [`error`] - Validation error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use balcao_core::ids::{next_sale_id, SALE_ID_PREFIX};
//! use balcao_core::types::MeioPagamento;
//!
//! // Derive the next sale id from the existing snapshot
//! let next = next_sale_id(["VND001", "VND003"]);
//! assert_eq!(next, "VND004");
//!
//! // Parse a payment method
//! let meio: MeioPagamento = "pix".parse().unwrap();
//! assert_eq!(meio.as_str(), "pix");
//! # let _ = SALE_ID_PREFIX;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ids;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::ValidationError;
pub use types::{Client, FaixaIdade, MeioPagamento, Product, Sale, SaleItem, TipoCliente};
