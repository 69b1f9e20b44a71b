//! # Generic Repository Core
//!
//! Schema-driven CRUD over dynamic [`Row`]s. The entity repositories wrap
//! this core and add their typed mapping plus business guards.
//!
//! ## Contracts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find_all / count   missing table reads as empty, never an error       │
//! │  insert             idempotent upsert on the primary key               │
//! │  update / delete    0 affected rows is a NotFound error                │
//! │  all writes         filtered against the declared schema columns;     │
//! │                     unknown fields are silently dropped               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All SQL is produced through the injected [`SqlDialect`]; nothing in this
//! file knows which engine it is talking to.

use sqlx::AnyPool;
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::{DbError, DbResult};
use crate::schema::TableSchema;
use crate::value::{bind_value, decode_row, Row, SqlValue};

// =============================================================================
// Table Repository
// =============================================================================

/// Generic CRUD access to one table.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: AnyPool,
    dialect: &'static dyn SqlDialect,
    schema: &'static TableSchema,
}

impl TableRepository {
    pub(crate) fn new(
        pool: AnyPool,
        dialect: &'static dyn SqlDialect,
        schema: &'static TableSchema,
    ) -> Self {
        TableRepository {
            pool,
            dialect,
            schema,
        }
    }

    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub(crate) fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect
    }

    pub(crate) fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// Whether the table exists in the connected database.
    pub async fn table_exists(&self) -> DbResult<bool> {
        let sql = self.dialect.table_exists_sql();
        let probe = sqlx::query(&sql)
            .bind(self.schema.name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(probe.is_some())
    }

    /// All rows in the table. A missing table reads as no rows.
    pub async fn find_all(&self) -> DbResult<Vec<Row>> {
        if !self.table_exists().await? {
            debug!(table = self.schema.name, "find_all on missing table");
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM {}",
            self.dialect.quote_ident(self.schema.name)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    /// One row by primary key, or `None`. A missing table reads as `None`.
    pub async fn find_by_id(&self, id: &SqlValue) -> DbResult<Option<Row>> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT 1",
            self.dialect.quote_ident(self.schema.name),
            self.dialect.quote_ident(self.schema.primary_key()),
            self.dialect.placeholder(1),
        );
        let row = bind_value(sqlx::query(&sql), id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    /// Upserts `row` on the primary key. Fields not declared in the schema
    /// are dropped; re-inserting an existing key overwrites the row.
    pub async fn insert(&self, row: &Row) -> DbResult<()> {
        let (columns, values) = self.schema_filtered(row);
        if columns.is_empty() {
            return Err(DbError::QueryFailed(format!(
                "no insertable columns for {}",
                self.schema.name
            )));
        }

        let sql = self
            .dialect
            .upsert(self.schema.name, self.schema.primary_key(), &columns);

        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        query.execute(&self.pool).await?;

        debug!(
            table = self.schema.name,
            columns = columns.len(),
            "row inserted"
        );
        Ok(())
    }

    /// Applies `updates` to the row with primary key `id`.
    ///
    /// Errors with [`DbError::NotFound`] when no row matches, and with
    /// [`DbError::QueryFailed`] when no requested field survives the schema
    /// filter.
    pub async fn update(&self, id: &SqlValue, updates: &Row) -> DbResult<()> {
        let (columns, values) = self.schema_filtered(updates);
        if columns.is_empty() {
            return Err(DbError::QueryFailed(format!(
                "no updatable columns for {}",
                self.schema.name
            )));
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{} = {}",
                    self.dialect.quote_ident(c),
                    self.dialect.placeholder(i + 1)
                )
            })
            .collect();

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.dialect.quote_ident(self.schema.name),
            assignments.join(", "),
            self.dialect.quote_ident(self.schema.primary_key()),
            self.dialect.placeholder(columns.len() + 1),
        );

        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = bind_value(query, id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(self.schema.name, id.to_string()));
        }
        Ok(())
    }

    /// Deletes the row with primary key `id`; [`DbError::NotFound`] when
    /// nothing matched.
    pub async fn delete(&self, id: &SqlValue) -> DbResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.dialect.quote_ident(self.schema.name),
            self.dialect.quote_ident(self.schema.primary_key()),
            self.dialect.placeholder(1),
        );
        let result = bind_value(sqlx::query(&sql), id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(self.schema.name, id.to_string()));
        }
        Ok(())
    }

    /// Row count. A missing table reads as zero.
    pub async fn count(&self) -> DbResult<i64> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect.quote_ident(self.schema.name)
        );
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Splits `row` into the declared columns it carries and their values,
    /// in schema order.
    fn schema_filtered<'a>(&self, row: &'a Row) -> (Vec<&'static str>, Vec<&'a SqlValue>) {
        self.schema
            .columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (*c, v)))
            .unzip()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
