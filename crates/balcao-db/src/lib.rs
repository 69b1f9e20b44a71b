//! # balcao-db: Database Layer
//!
//! Persistence for Balcão on SQLite or PostgreSQL, chosen by connection
//! URL at startup.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           balcao-db                                     │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────────────────────────────────────┐  │
//! │  │   Database   │───►│  products() / clients() / sales() / items()  │  │
//! │  │  (pool +     │    │        entity repositories                   │  │
//! │  │   backend)   │    └──────────────────────┬───────────────────────┘  │
//! │  └──────┬───────┘                           │                          │
//! │         │ begin()                           ▼                          │
//! │         ▼                        ┌──────────────────┐                  │
//! │  ┌──────────────┐                │ TableRepository  │                  │
//! │  │ Transaction  │◄───── _in() ───┤  (generic core)  │                  │
//! │  └──────────────┘                └────────┬─────────┘                  │
//! │                                           │                            │
//! │                                           ▼                            │
//! │                              ┌─────────────────────────┐               │
//! │                              │ SqlDialect (seam)       │               │
//! │                              │  SQLite  │  PostgreSQL  │               │
//! │                              └─────────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use balcao_db::{Database, DbConfig};
//!
//! # async fn example() -> balcao_db::DbResult<()> {
//! let db = Database::connect(DbConfig::sqlite_file("data/loja.db")).await?;
//! let products = db.products().get_all().await?;
//! println!("{} products in stock", products.len());
//! # Ok(())
//! # }
//! ```

pub mod dialect;
pub mod error;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod value;

pub use dialect::{Backend, PostgresDialect, SqlDialect, SqliteDialect};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    ClientRepository, InventoryValue, MeioRevenue, ProductRepository, SaleItemRepository,
    SaleRepository, SalesSummary, TableRepository, TopClient, TopProduct,
};
pub use value::{Row, SqlValue};
