//! # SQL Dialect Seam
//!
//! The two supported engines differ in exactly four places; everything else
//! in the repository layer is engine-agnostic SQL.
//!
//! ## Dialect Differences
//! ```text
//! ┌──────────────────┬──────────────────────────┬───────────────────────────────┐
//! │                  │ SQLite                   │ PostgreSQL                    │
//! ├──────────────────┼──────────────────────────┼───────────────────────────────┤
//! │ placeholder      │ ?                        │ $1, $2, ...                   │
//! │ upsert           │ INSERT OR REPLACE        │ INSERT .. ON CONFLICT (pk)    │
//! │                  │                          │   DO UPDATE SET c=EXCLUDED.c  │
//! │ table probe      │ sqlite_master            │ information_schema.tables     │
//! │ identifiers      │ "QUOTED" (both)          │ "QUOTED" (both)               │
//! └──────────────────┴──────────────────────────┴───────────────────────────────┘
//! ```
//!
//! A repository receives its dialect **once**, at construction; no query
//! method ever branches on the engine. Adding a third engine means adding a
//! third [`SqlDialect`] impl, not touching the repositories.

use std::fmt;

use crate::error::{DbError, DbResult};

// =============================================================================
// Dialect Trait
// =============================================================================

/// The engine-specific parts of SQL generation.
pub trait SqlDialect: fmt::Debug + Send + Sync {
    /// Dialect name for logs.
    fn name(&self) -> &'static str;

    /// The bind placeholder for 1-based `position`.
    fn placeholder(&self, position: usize) -> String;

    /// A comma-separated placeholder list for `count` binds starting at
    /// position `start` (1-based).
    fn placeholders(&self, start: usize, count: usize) -> String {
        (start..start + count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Quotes an identifier, preserving its exact case in both engines.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    /// A plain insert for `columns` into `table`; duplicate keys fail.
    fn insert(&self, table: &str, columns: &[&str]) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_ident(table),
            columns
                .iter()
                .map(|c| self.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            self.placeholders(1, columns.len()),
        )
    }

    /// An idempotent insert for `columns` into `table`: re-inserting the
    /// same `pk` overwrites the row instead of failing.
    fn upsert(&self, table: &str, pk: &str, columns: &[&str]) -> String;

    /// A probe query with one bind (the table name) that returns a row iff
    /// the table exists.
    fn table_exists_sql(&self) -> String;
}

// =============================================================================
// SQLite
// =============================================================================

#[derive(Debug)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn upsert(&self, table: &str, _pk: &str, columns: &[&str]) -> String {
        format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.quote_ident(table),
            quote_list(self, columns),
            self.placeholders(1, columns.len()),
        )
    }

    fn table_exists_sql(&self) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[derive(Debug)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${position}")
    }

    fn upsert(&self, table: &str, pk: &str, columns: &[&str]) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .filter(|c| **c != pk)
            .map(|c| {
                let q = self.quote_ident(c);
                format!("{q} = EXCLUDED.{q}")
            })
            .collect();

        let conflict_action = if assignments.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", assignments.join(", "))
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
            self.quote_ident(table),
            quote_list(self, columns),
            self.placeholders(1, columns.len()),
            self.quote_ident(pk),
            conflict_action,
        )
    }

    fn table_exists_sql(&self) -> String {
        // Scoped to the active schema so a same-named table elsewhere on the
        // search path does not count as ours.
        "SELECT 1 FROM information_schema.tables \
         WHERE table_name = $1 AND table_schema = current_schema()"
            .to_string()
    }
}

fn quote_list(dialect: &dyn SqlDialect, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Backend Selection
// =============================================================================

static SQLITE: SqliteDialect = SqliteDialect;
static POSTGRES: PostgresDialect = PostgresDialect;

/// The database engine behind the pool, decided once from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    /// Parses the engine out of a connection URL.
    ///
    /// Accepts `sqlite:` (including `sqlite::memory:`) and
    /// `postgres:`/`postgresql:` schemes.
    pub fn from_url(url: &str) -> DbResult<Self> {
        let scheme = url.split(':').next().unwrap_or("").to_lowercase();
        match scheme.as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            _ => Err(DbError::UnsupportedBackend(url.to_string())),
        }
    }

    /// The dialect for this engine.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Backend::Sqlite => &SQLITE,
            Backend::Postgres => &POSTGRES,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_url("sqlite://data/loja.db?mode=rwc").unwrap(),
            Backend::Sqlite
        );
        assert_eq!(
            Backend::from_url("postgres://user:pw@localhost/loja").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("postgresql://localhost/loja").unwrap(),
            Backend::Postgres
        );
        assert!(Backend::from_url("mysql://localhost/loja").is_err());
        assert!(Backend::from_url("loja.db").is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(SQLITE.placeholders(1, 3), "?, ?, ?");
        assert_eq!(POSTGRES.placeholders(1, 3), "$1, $2, $3");
        assert_eq!(POSTGRES.placeholders(4, 2), "$4, $5");
    }

    #[test]
    fn test_sqlite_upsert() {
        let sql = SQLITE.upsert("products", "CODIGO", &["CODIGO", "PRODUTO"]);
        assert_eq!(
            sql,
            "INSERT OR REPLACE INTO \"products\" (\"CODIGO\", \"PRODUTO\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_postgres_upsert() {
        let sql = POSTGRES.upsert("products", "CODIGO", &["CODIGO", "PRODUTO"]);
        assert_eq!(
            sql,
            "INSERT INTO \"products\" (\"CODIGO\", \"PRODUTO\") VALUES ($1, $2) \
             ON CONFLICT (\"CODIGO\") DO UPDATE SET \"PRODUTO\" = EXCLUDED.\"PRODUTO\""
        );
    }

    #[test]
    fn test_postgres_upsert_pk_only() {
        let sql = POSTGRES.upsert("t", "ID", &["ID"]);
        assert_eq!(
            sql,
            "INSERT INTO \"t\" (\"ID\") VALUES ($1) ON CONFLICT (\"ID\") DO NOTHING"
        );
    }

    #[test]
    fn test_table_probe_sql() {
        assert_eq!(
            SQLITE.table_exists_sql(),
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"
        );
        assert_eq!(
            POSTGRES.table_exists_sql(),
            "SELECT 1 FROM information_schema.tables \
             WHERE table_name = $1 AND table_schema = current_schema()"
        );
    }

    #[test]
    fn test_quote_ident_preserves_case() {
        assert_eq!(SQLITE.quote_ident("VALOR_TOTAL_VENDA"), "\"VALOR_TOTAL_VENDA\"");
        assert_eq!(POSTGRES.quote_ident("CODIGO"), "\"CODIGO\"");
    }
}
