//! # balcao-service: Sale Coordination
//!
//! The write-side orchestration layer of Balcão. Everything that must
//! happen together when money changes hands at the counter lives here.
//!
//! ## Position In The Stack
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   UI / CLI / API                                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   balcao-service   SaleService::register_sale / cancel_sale            │
//! │        │           (one transaction across three tables)               │
//! │        ▼                                                                │
//! │   balcao-db        repositories, dialect seam, pool                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   SQLite / PostgreSQL                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use balcao_db::{Database, DbConfig};
//! use balcao_service::{SaleItemRequest, SaleRequest, SaleService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect(DbConfig::sqlite_file("data/loja.db")).await?;
//! let sales = SaleService::new(db);
//!
//! let receipt = sales
//!     .register_sale(&SaleRequest {
//!         id_cliente: "CLI001".to_string(),
//!         meio: "pix".to_string(),
//!         data: None,
//!         items: vec![SaleItemRequest::new("ABR01", 2)],
//!     })
//!     .await?;
//! println!("sale {} total R$ {:.2}", receipt.id_venda, receipt.valor_total);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod sale;

pub use error::{ServiceError, ServiceResult};
pub use sale::{CancelReceipt, SaleItemRequest, SaleReceipt, SaleRequest, SaleService};
