//! # Product Repository
//!
//! Inventory access. Products carry a natural key (`CODIGO`) that is stored
//! uppercase and matched case-insensitively, so `"abr01"` at the counter
//! finds the row saved as `"ABR01"`.
//!
//! ## Stock Decrements
//! Stock never goes negative. The decrement is a single conditional
//! `UPDATE ... WHERE "ESTOQUE" + delta >= 0`: the check and the write are
//! one statement, so two concurrent sales cannot both pass a read-side
//! check and oversell the last unit.

use sqlx::AnyConnection;
use sqlx::AnyPool;
use tracing::{debug, info};

use balcao_core::{validation, Product, ValidationError};
use serde::Serialize;

use crate::dialect::SqlDialect;
use crate::error::{DbError, DbResult};
use crate::repository::core::TableRepository;
use crate::schema;
use crate::value::{decode_row, Row, SqlValue};

// =============================================================================
// Reporting DTO
// =============================================================================

/// Inventory valuation across all products.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryValue {
    /// Stock valued at cost price.
    pub at_cost: f64,
    /// Stock valued at selling price.
    pub at_retail: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    table: TableRepository,
}

impl ProductRepository {
    pub(crate) fn new(pool: AnyPool, dialect: &'static dyn SqlDialect) -> Self {
        ProductRepository {
            table: TableRepository::new(pool, dialect, &schema::PRODUCTS),
        }
    }

    // =========================================================================
    // Row Mapping
    // =========================================================================

    fn to_row(product: &Product) -> Row {
        Row::new()
            .with("CODIGO", product.codigo.as_str())
            .with("PRODUTO", product.produto.as_str())
            .with("CATEGORIA", product.categoria.as_str())
            .with("CUSTO", product.custo)
            .with("VALOR", product.valor)
            .with("ESTOQUE", product.estoque)
    }

    fn from_row(row: &Row) -> DbResult<Product> {
        Ok(Product {
            codigo: row.get_text("CODIGO")?,
            produto: row.get_text("PRODUTO")?,
            categoria: row.get_opt_text("CATEGORIA")?.unwrap_or_default(),
            custo: row.get_opt_real("CUSTO")?.unwrap_or(0.0),
            valor: row.get_opt_real("VALOR")?.unwrap_or(0.0),
            estoque: row.get_opt_integer("ESTOQUE")?.unwrap_or(0),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    fn lookup_sql(&self) -> String {
        let d = self.table.dialect();
        format!(
            "SELECT * FROM {} WHERE UPPER({}) = UPPER({}) LIMIT 1",
            d.quote_ident("products"),
            d.quote_ident("CODIGO"),
            d.placeholder(1),
        )
    }

    /// Looks a product up by code, case-insensitively.
    pub async fn get_by_codigo(&self, codigo: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query(&self.lookup_sql())
            .bind(codigo.trim())
            .fetch_optional(self.table.pool())
            .await?;

        match row {
            Some(raw) => Ok(Some(Self::from_row(&decode_row(&raw)?)?)),
            None => Ok(None),
        }
    }

    /// Same lookup on an explicit connection, for reads that must see a
    /// transaction's own writes.
    async fn get_by_codigo_in(
        &self,
        conn: &mut AnyConnection,
        codigo: &str,
    ) -> DbResult<Option<Product>> {
        let row = sqlx::query(&self.lookup_sql())
            .bind(codigo.trim())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(raw) => Ok(Some(Self::from_row(&decode_row(&raw)?)?)),
            None => Ok(None),
        }
    }

    /// Whether a product with this code exists.
    pub async fn exists(&self, codigo: &str) -> DbResult<bool> {
        Ok(self.get_by_codigo(codigo).await?.is_some())
    }

    /// All products.
    pub async fn get_all(&self) -> DbResult<Vec<Product>> {
        self.table
            .find_all()
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    /// Products in a category, matched case-insensitively.
    pub async fn get_by_category(&self, categoria: &str) -> DbResult<Vec<Product>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE UPPER({}) = UPPER({}) ORDER BY {}",
            d.quote_ident("products"),
            d.quote_ident("CATEGORIA"),
            d.placeholder(1),
            d.quote_ident("PRODUTO"),
        );
        let rows = sqlx::query(&sql)
            .bind(categoria.trim())
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    /// Products at or below `threshold` units, lowest stock first.
    pub async fn get_low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE {} <= {} ORDER BY {}",
            d.quote_ident("products"),
            d.quote_ident("ESTOQUE"),
            d.placeholder(1),
            d.quote_ident("ESTOQUE"),
        );
        let rows = sqlx::query(&sql)
            .bind(threshold)
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    /// Total inventory valuation at cost and at retail.
    pub async fn inventory_value(&self) -> DbResult<InventoryValue> {
        let products = self.get_all().await?;
        Ok(InventoryValue {
            at_cost: products.iter().map(Product::inventory_value).sum(),
            at_retail: products.iter().map(Product::retail_value).sum(),
        })
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.table.count().await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a new product. Create-only: an existing code is a
    /// [`DbError::UniqueViolation`], never an overwrite.
    pub async fn save(&self, product: &Product) -> DbResult<()> {
        if self.exists(&product.codigo).await? {
            return Err(DbError::duplicate("CODIGO", &product.codigo));
        }

        self.table.insert(&Self::to_row(product)).await?;
        info!(codigo = %product.codigo, "product created");
        Ok(())
    }

    /// Applies field updates to an existing product.
    ///
    /// `CODIGO` is immutable. The updatable fields keep their creation
    /// rules: `PRODUTO` non-blank, `CUSTO`/`VALOR` positive, `ESTOQUE`
    /// non-negative.
    pub async fn update(&self, codigo: &str, updates: &Row) -> DbResult<()> {
        Self::validate_updates(updates)?;

        let key = codigo.trim().to_uppercase();
        if !self.exists(&key).await? {
            return Err(DbError::not_found("product", key));
        }

        self.table.update(&SqlValue::from(key.as_str()), updates).await?;
        debug!(codigo = %key, fields = updates.len(), "product updated");
        Ok(())
    }

    fn validate_updates(updates: &Row) -> DbResult<()> {
        if updates.contains("CODIGO") {
            return Err(ValidationError::InvalidFormat {
                field: "CODIGO",
                reason: "cannot be changed after creation".to_string(),
            }
            .into());
        }

        if let Some(v) = updates.get("PRODUTO") {
            match v.as_text() {
                Some(s) => validation::validate_required("PRODUTO", s)?,
                None => return Err(ValidationError::Required { field: "PRODUTO" }.into()),
            }
        }

        for (column, field) in [("CUSTO", "CUSTO"), ("VALOR", "VALOR")] {
            if updates.contains(column) {
                match updates.get_opt_real(column)? {
                    Some(value) => validation::validate_positive_price(field, value)?,
                    None => return Err(ValidationError::MustBePositive { field }.into()),
                }
            }
        }

        if updates.contains("ESTOQUE") {
            match updates.get_opt_integer("ESTOQUE")? {
                Some(estoque) if estoque >= 0 => {}
                _ => return Err(ValidationError::CannotBeNegative { field: "ESTOQUE" }.into()),
            }
        }

        Ok(())
    }

    /// Deletes a product; [`DbError::NotFound`] when the code is unknown.
    ///
    /// Sale history keeps its `CODIGO` snapshots; cancelling a sale of a
    /// deleted product skips the restock for it.
    pub async fn delete(&self, codigo: &str) -> DbResult<()> {
        let key = codigo.trim().to_uppercase();
        self.table.delete(&SqlValue::from(key.as_str())).await?;
        info!(codigo = %key, "product deleted");
        Ok(())
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Atomically adjusts stock by `delta` (negative sells, positive
    /// restocks) and returns the new level.
    ///
    /// ## Errors
    /// - [`DbError::NotFound`] when the code is unknown
    /// - [`DbError::InsufficientStock`] when the decrement would go negative
    pub async fn update_stock(&self, codigo: &str, delta: i64) -> DbResult<i64> {
        // The adjust and the follow-up read share one transaction, so the
        // reported level and the InsufficientStock context cannot come from
        // a row another connection changed in between.
        let mut tx = self.table.pool().begin().await.map_err(DbError::from)?;

        let adjusted = self.adjust_stock_in(&mut tx, codigo, delta).await?;
        let product = self
            .get_by_codigo_in(&mut tx, codigo)
            .await?
            .ok_or_else(|| DbError::not_found("product", codigo.trim().to_uppercase()))?;

        if !adjusted {
            return Err(DbError::InsufficientStock {
                codigo: product.codigo,
                available: product.estoque,
                requested: delta.abs(),
            });
        }

        tx.commit().await.map_err(DbError::from)?;
        debug!(codigo = %product.codigo, delta, estoque = product.estoque, "stock adjusted");
        Ok(product.estoque)
    }

    /// The conditional stock adjustment, on an explicit connection so it can
    /// join a caller's transaction.
    ///
    /// Returns `false` when no row was touched: the product is missing or
    /// the decrement would go negative. The caller disambiguates.
    pub async fn adjust_stock_in(
        &self,
        conn: &mut AnyConnection,
        codigo: &str,
        delta: i64,
    ) -> DbResult<bool> {
        let d = self.table.dialect();
        // Three distinct placeholders: SQLite binds each `?` separately.
        let sql = format!(
            "UPDATE {t} SET {e} = {e} + {p1} \
             WHERE UPPER({c}) = UPPER({p2}) AND {e} + {p3} >= 0",
            t = d.quote_ident("products"),
            e = d.quote_ident("ESTOQUE"),
            c = d.quote_ident("CODIGO"),
            p1 = d.placeholder(1),
            p2 = d.placeholder(2),
            p3 = d.placeholder(3),
        );

        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(codigo.trim())
            .bind(delta)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::connect(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    fn aromatizador() -> Product {
        Product::new("ABR01", "Aromatizador Lavanda", "Casa", 8.0, 20.0, 10).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_lookup_case_insensitive() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();

        let found = repo.get_by_codigo("abr01").await.unwrap().expect("product");
        assert_eq!(found.codigo, "ABR01");
        assert_eq!(found.estoque, 10);
        assert!(repo.exists(" Abr01 ").await.unwrap());
        assert!(!repo.exists("ABR99").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_is_create_only() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();

        let err = repo.save(&aromatizador()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_validates_fields() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();

        repo.update("ABR01", &Row::new().with("VALOR", 25.0))
            .await
            .unwrap();
        let p = repo.get_by_codigo("ABR01").await.unwrap().unwrap();
        assert!((p.valor - 25.0).abs() < f64::EPSILON);

        assert!(repo
            .update("ABR01", &Row::new().with("VALOR", 0.0))
            .await
            .is_err());
        assert!(repo
            .update("ABR01", &Row::new().with("ESTOQUE", -1i64))
            .await
            .is_err());
        assert!(repo
            .update("ABR01", &Row::new().with("CODIGO", "ABR02"))
            .await
            .is_err());
        assert!(repo
            .update("GHOST", &Row::new().with("VALOR", 9.0))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_stock_decrement_and_floor() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();

        assert_eq!(repo.update_stock("abr01", -4).await.unwrap(), 6);
        assert_eq!(repo.update_stock("ABR01", 2).await.unwrap(), 8);

        let err = repo.update_stock("ABR01", -9).await.unwrap_err();
        match err {
            DbError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 8);
                assert_eq!(requested, 9);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // The failed decrement left stock untouched.
        let p = repo.get_by_codigo("ABR01").await.unwrap().unwrap();
        assert_eq!(p.estoque, 8);

        assert!(repo.update_stock("GHOST", -1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_category_and_low_stock_queries() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();
        repo.save(&Product::new("VEL01", "Vela Baunilha", "casa", 5.0, 15.0, 2).unwrap())
            .await
            .unwrap();
        repo.save(&Product::new("DIF01", "Difusor", "Presentes", 12.0, 30.0, 1).unwrap())
            .await
            .unwrap();

        let casa = repo.get_by_category("CASA").await.unwrap();
        assert_eq!(casa.len(), 2);

        let low = repo.get_low_stock(2).await.unwrap();
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].codigo, "DIF01");

        let value = repo.inventory_value().await.unwrap();
        assert!((value.at_cost - (8.0 * 10.0 + 5.0 * 2.0 + 12.0)).abs() < 1e-9);
        assert!((value.at_retail - (20.0 * 10.0 + 15.0 * 2.0 + 30.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = db().await.products();
        repo.save(&aromatizador()).await.unwrap();

        repo.delete("abr01").await.unwrap();
        assert!(!repo.exists("ABR01").await.unwrap());
        assert!(repo.delete("ABR01").await.unwrap_err().is_not_found());
    }
}
