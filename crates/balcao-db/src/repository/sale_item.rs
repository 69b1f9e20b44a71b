//! # Sale Item Repository
//!
//! Line items. Items have no identity of their own: they always belong to a
//! sale header and are written and deleted as a batch keyed on `ID_VENDA`,
//! so this repository skips the pk-based core operations entirely.

use sqlx::AnyConnection;
use sqlx::AnyPool;
use tracing::debug;

use balcao_core::SaleItem;

use crate::dialect::SqlDialect;
use crate::error::{DbError, DbResult};
use crate::repository::core::TableRepository;
use crate::schema;
use crate::value::{bind_value, decode_row, Row, SqlValue};

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale line items.
#[derive(Debug, Clone)]
pub struct SaleItemRepository {
    table: TableRepository,
}

impl SaleItemRepository {
    pub(crate) fn new(pool: AnyPool, dialect: &'static dyn SqlDialect) -> Self {
        SaleItemRepository {
            table: TableRepository::new(pool, dialect, &schema::SALES_ITEMS),
        }
    }

    // =========================================================================
    // Row Mapping
    // =========================================================================

    fn to_row(item: &SaleItem) -> Row {
        Row::new()
            .with("ID_VENDA", item.id_venda.as_str())
            .with("PRODUTO", item.produto.as_str())
            .with("CATEGORIA", item.categoria.as_str())
            .with("CODIGO", item.codigo.as_str())
            .with("QUANTIDADE", item.quantidade)
            .with("PRECO_UNIT", item.preco_unit)
            .with("PRECO_TOTAL", item.preco_total)
    }

    fn from_row(row: &Row) -> DbResult<SaleItem> {
        Ok(SaleItem {
            id_venda: row.get_text("ID_VENDA")?,
            produto: row.get_opt_text("PRODUTO")?.unwrap_or_default(),
            categoria: row.get_opt_text("CATEGORIA")?.unwrap_or_default(),
            codigo: row.get_text("CODIGO")?,
            quantidade: row.get_integer("QUANTIDADE")?,
            preco_unit: row.get_opt_real("PRECO_UNIT")?.unwrap_or(0.0),
            preco_total: row.get_opt_real("PRECO_TOTAL")?.unwrap_or(0.0),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The line items of one sale.
    pub async fn get_by_sale_id(&self, id_venda: &str) -> DbResult<Vec<SaleItem>> {
        if !self.table.table_exists().await? {
            return Ok(Vec::new());
        }

        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = {} ORDER BY {}",
            d.quote_ident("sales_items"),
            d.quote_ident("ID_VENDA"),
            d.placeholder(1),
            d.quote_ident("CODIGO"),
        );
        let rows = sqlx::query(&sql)
            .bind(id_venda.trim().to_uppercase())
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    /// Every line ever sold of one product, across all sales.
    pub async fn get_by_product(&self, codigo: &str) -> DbResult<Vec<SaleItem>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE UPPER({}) = UPPER({}) ORDER BY {}",
            d.quote_ident("sales_items"),
            d.quote_ident("CODIGO"),
            d.placeholder(1),
            d.quote_ident("ID_VENDA"),
        );
        let rows = sqlx::query(&sql)
            .bind(codigo.trim())
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    pub async fn get_all(&self) -> DbResult<Vec<SaleItem>> {
        self.table
            .find_all()
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.table.count().await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Persists a batch of items in one transaction of its own.
    ///
    /// The coordinator does not use this; it writes batches through
    /// [`save_many_in`](Self::save_many_in) inside its own transaction.
    pub async fn save_many(&self, items: &[SaleItem]) -> DbResult<()> {
        let mut tx = self.table.pool().begin().await.map_err(DbError::from)?;
        self.save_many_in(&mut tx, items).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Inserts a batch of items inside the caller's transaction.
    pub async fn save_many_in(
        &self,
        conn: &mut AnyConnection,
        items: &[SaleItem],
    ) -> DbResult<()> {
        let d = self.table.dialect();
        let sql = d.insert("sales_items", schema::SALES_ITEMS.columns);

        for item in items {
            let row = Self::to_row(item);
            let mut query = sqlx::query(&sql);
            for column in schema::SALES_ITEMS.columns {
                let value = row.get(column).cloned().unwrap_or(SqlValue::Null);
                query = bind_value(query, &value);
            }
            query.execute(&mut *conn).await?;
        }

        debug!(items = items.len(), "sale items inserted");
        Ok(())
    }

    /// Deletes all items of one sale. Returns how many rows went away.
    pub async fn delete_by_sale_id(&self, id_venda: &str) -> DbResult<u64> {
        let mut conn = self.table.pool().acquire().await.map_err(DbError::from)?;
        self.delete_by_sale_id_in(&mut conn, id_venda).await
    }

    /// Deletes all items of one sale inside the caller's transaction.
    pub async fn delete_by_sale_id_in(
        &self,
        conn: &mut AnyConnection,
        id_venda: &str,
    ) -> DbResult<u64> {
        let d = self.table.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            d.quote_ident("sales_items"),
            d.quote_ident("ID_VENDA"),
            d.placeholder(1),
        );
        let result = sqlx::query(&sql)
            .bind(id_venda.trim().to_uppercase())
            .execute(&mut *conn)
            .await?;
        debug!(id_venda, rows = result.rows_affected(), "sale items deleted");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
