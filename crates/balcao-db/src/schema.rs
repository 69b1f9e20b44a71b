//! # Table Schemas and Startup DDL
//!
//! The four tables, their declared columns, and the idempotent DDL that
//! creates them on startup.
//!
//! ## Stability Contract
//! Table names, the uppercase quoted column names, and the column types are
//! load-bearing: the reporting and export layers read these columns by name.
//! Every identifier in generated SQL is double-quoted so both engines
//! preserve the exact case.
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌────────────┐     ┌──────────────┐
//! │  products  │     │  clients   │     │   sales    │ 1:N │ sales_items  │
//! │  ────────  │     │  ────────  │     │  ────────  │◄────┤  ──────────  │
//! │  CODIGO PK │     │ ID_CLIENTE │     │  ID_VENDA  │     │  ID_VENDA FK │
//! │  PRODUTO   │     │     PK     │     │     PK     │     │  CODIGO      │
//! │  ESTOQUE   │     │  TIPO ...  │     │  MEIO ...  │     │  QUANTIDADE  │
//! └────────────┘     └────────────┘     └────────────┘     └──────────────┘
//! ```
//!
//! Sale items reference products by `CODIGO` **without** a foreign key:
//! deleting a product must not invalidate sale history (cancellation then
//! skips the restock for the missing product and logs a warning).

use sqlx::AnyPool;
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Table Schema
// =============================================================================

/// Declared shape of one table. Writes through the repository core are
/// filtered against `columns`; fields not listed here are silently dropped.
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    /// The primary key column, by convention:
    /// `CODIGO` if declared, else the first `ID_*` column, else the first
    /// column.
    pub fn primary_key(&self) -> &'static str {
        if self.columns.contains(&"CODIGO") {
            return "CODIGO";
        }
        self.columns
            .iter()
            .find(|c| c.starts_with("ID_"))
            .or_else(|| self.columns.first())
            .copied()
            .unwrap_or("CODIGO")
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(&name)
    }
}

pub static PRODUCTS: TableSchema = TableSchema {
    name: "products",
    columns: &["CODIGO", "PRODUTO", "CATEGORIA", "CUSTO", "VALOR", "ESTOQUE"],
};

pub static CLIENTS: TableSchema = TableSchema {
    name: "clients",
    columns: &[
        "ID_CLIENTE",
        "CLIENTE",
        "VENDEDOR",
        "TIPO",
        "IDADE",
        "GENERO",
        "PROFISSAO",
        "CPF_CNPJ",
        "TELEFONE",
        "ENDERECO",
    ],
};

pub static SALES: TableSchema = TableSchema {
    name: "sales",
    columns: &[
        "ID_VENDA",
        "ID_CLIENTE",
        "CLIENTE",
        "MEIO",
        "DATA",
        "VALOR_TOTAL_VENDA",
    ],
};

pub static SALES_ITEMS: TableSchema = TableSchema {
    name: "sales_items",
    columns: &[
        "ID_VENDA",
        "PRODUTO",
        "CATEGORIA",
        "CODIGO",
        "QUANTIDADE",
        "PRECO_UNIT",
        "PRECO_TOTAL",
    ],
};

// =============================================================================
// Startup DDL
// =============================================================================

// One DDL set for both engines: TEXT / BIGINT / DOUBLE PRECISION and
// CREATE ... IF NOT EXISTS are valid SQLite and PostgreSQL alike.
const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "products" (
        "CODIGO"    TEXT PRIMARY KEY,
        "PRODUTO"   TEXT NOT NULL,
        "CATEGORIA" TEXT,
        "CUSTO"     DOUBLE PRECISION,
        "VALOR"     DOUBLE PRECISION,
        "ESTOQUE"   BIGINT NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "clients" (
        "ID_CLIENTE" TEXT PRIMARY KEY,
        "CLIENTE"    TEXT NOT NULL,
        "VENDEDOR"   TEXT,
        "TIPO"       TEXT NOT NULL,
        "IDADE"      TEXT,
        "GENERO"     TEXT,
        "PROFISSAO"  TEXT,
        "CPF_CNPJ"   TEXT,
        "TELEFONE"   TEXT,
        "ENDERECO"   TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sales" (
        "ID_VENDA"          TEXT PRIMARY KEY,
        "ID_CLIENTE"        TEXT NOT NULL,
        "CLIENTE"           TEXT,
        "MEIO"              TEXT,
        "DATA"              TEXT,
        "VALOR_TOTAL_VENDA" DOUBLE PRECISION
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "sales_items" (
        "ID_VENDA"    TEXT NOT NULL,
        "PRODUTO"     TEXT,
        "CATEGORIA"   TEXT,
        "CODIGO"      TEXT NOT NULL,
        "QUANTIDADE"  BIGINT NOT NULL,
        "PRECO_UNIT"  DOUBLE PRECISION,
        "PRECO_TOTAL" DOUBLE PRECISION,
        FOREIGN KEY ("ID_VENDA") REFERENCES "sales" ("ID_VENDA")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_sales_items_id_venda"
        ON "sales_items" ("ID_VENDA")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_sales_items_codigo"
        ON "sales_items" ("CODIGO")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_sales_id_cliente"
        ON "sales" ("ID_CLIENTE")"#,
];

/// Creates the tables and indexes if they do not exist yet. Safe to run on
/// every startup.
pub async fn ensure_schema(pool: &AnyPool) -> DbResult<()> {
    for statement in DDL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaSetupFailed(e.to_string()))?;
    }
    debug!("schema ensured ({} statements)", DDL.len());
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_convention() {
        assert_eq!(PRODUCTS.primary_key(), "CODIGO");
        assert_eq!(CLIENTS.primary_key(), "ID_CLIENTE");
        assert_eq!(SALES.primary_key(), "ID_VENDA");
        // sales_items has no row identity of its own; the convention picks
        // CODIGO, which is why the item repository never goes through
        // pk-based core operations.
        assert_eq!(SALES_ITEMS.primary_key(), "CODIGO");

        let no_id = TableSchema {
            name: "settings",
            columns: &["CHAVE", "VALOR"],
        };
        assert_eq!(no_id.primary_key(), "CHAVE");
    }

    #[test]
    fn test_has_column() {
        assert!(PRODUCTS.has_column("ESTOQUE"));
        assert!(!PRODUCTS.has_column("estoque"));
        assert!(!PRODUCTS.has_column("DESCONTO"));
    }
}
