//! # Repository Layer
//!
//! One generic core, four entity repositories on top of it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   ProductRepository   ClientRepository   SaleRepository   SaleItemRepo  │
//! │   (typed mapping, guards, entity queries)                               │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                       TableRepository                                   │
//! │          (schema-filtered CRUD over dynamic rows)                       │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                  SqlDialect + sqlx Any pool                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod core;
pub mod product;
pub mod sale;
pub mod sale_item;

pub use client::ClientRepository;
pub use core::TableRepository;
pub use product::{InventoryValue, ProductRepository};
pub use sale::{MeioRevenue, SaleRepository, SalesSummary, TopClient, TopProduct};
pub use sale_item::SaleItemRepository;
