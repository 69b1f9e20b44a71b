//! # Connection Pool and Database Handle
//!
//! One [`Database`] handle per process: it owns the pool, knows which
//! engine it is talking to, and hands out the entity repositories.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig ──► Backend::from_url  (sqlite / postgres, or fail fast)     │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │          install_default_drivers  (once per process)                   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │          AnyPoolOptions::connect  (+ PRAGMA foreign_keys on SQLite)    │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │          ensure_schema  (idempotent DDL)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Once;
use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool, Transaction};
use tracing::info;

use crate::dialect::Backend;
use crate::error::{DbError, DbResult};
use crate::repository::{
    ClientRepository, ProductRepository, SaleItemRepository, SaleRepository,
};
use crate::schema;

static DRIVERS: Once = Once::new();

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// The URL scheme picks the engine: `sqlite:` or `postgres:`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub create_schema: bool,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        DbConfig {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            create_schema: true,
        }
    }

    /// A SQLite file database, created if missing.
    pub fn sqlite_file(path: &str) -> Self {
        Self::new(format!("sqlite://{path}?mode=rwc"))
    }

    /// An in-memory SQLite database, for tests and demos.
    ///
    /// Pinned to a single connection: each in-memory connection is its own
    /// empty database, so a second one would see no tables.
    pub fn in_memory() -> Self {
        DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: None,
            create_schema: true,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Leaves table creation to the operator (managed PostgreSQL setups).
    pub fn skip_schema_setup(mut self) -> Self {
        self.create_schema = false;
        self
    }
}

// =============================================================================
// Database Handle
// =============================================================================

/// The shared handle to the connected database.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

impl Database {
    /// Connects, applies per-connection session setup, and ensures the
    /// schema exists.
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        let backend = Backend::from_url(&config.url)?;
        DRIVERS.call_once(sqlx::any::install_default_drivers);

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);

        if backend == Backend::Sqlite {
            // SQLite leaves foreign keys off unless every connection opts in.
            options = options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            });
        }

        let pool = options
            .connect(&config.url)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        if config.create_schema {
            schema::ensure_schema(&pool).await?;
        }

        info!(backend = %backend, "database connected");
        Ok(Database { pool, backend })
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.backend.dialect())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone(), self.backend.dialect())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone(), self.backend.dialect())
    }

    pub fn sale_items(&self) -> SaleItemRepository {
        SaleItemRepository::new(self.pool.clone(), self.backend.dialect())
    }

    // =========================================================================
    // Infrastructure
    // =========================================================================

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Starts a transaction for a multi-write operation.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Any>> {
        self.pool.begin().await.map_err(DbError::from)
    }

    /// Round-trips a trivial query.
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
