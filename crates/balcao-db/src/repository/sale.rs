//! # Sale Repository
//!
//! Sale headers plus the read-side aggregates the reporting layer asks for.
//!
//! ## Header/Item Split
//! A sale is a header row here plus N line items in `sales_items`, all
//! sharing one `ID_VENDA`. The coordinator in `balcao-service` is the only
//! writer that touches both; the transactional `_in` methods exist so those
//! writes join its transaction instead of running on the pool.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::AnyConnection;
use sqlx::AnyPool;
use tracing::{debug, info};

use balcao_core::{ids, Sale};

use crate::dialect::SqlDialect;
use crate::error::{DbError, DbResult};
use crate::repository::core::TableRepository;
use crate::schema;
use crate::value::{bind_value, decode_row, Row, SqlValue};

// =============================================================================
// Reporting DTOs
// =============================================================================

/// Revenue grouped by payment method.
#[derive(Debug, Clone, Serialize)]
pub struct MeioRevenue {
    pub meio: String,
    pub revenue: f64,
}

/// Headline sales figures.
#[derive(Debug, Clone, Serialize)]
pub struct SalesSummary {
    pub total_sales: i64,
    pub total_revenue: f64,
    pub average_sale: f64,
    pub by_meio: Vec<MeioRevenue>,
}

/// A best-selling product, aggregated from sale items.
#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub codigo: String,
    pub produto: String,
    pub total_quantidade: i64,
    pub total_revenue: f64,
}

/// A highest-spending client, aggregated from sale headers.
#[derive(Debug, Clone, Serialize)]
pub struct TopClient {
    pub id_cliente: String,
    pub cliente: String,
    pub num_compras: i64,
    pub total_gasto: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale header operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    table: TableRepository,
}

impl SaleRepository {
    pub(crate) fn new(pool: AnyPool, dialect: &'static dyn SqlDialect) -> Self {
        SaleRepository {
            table: TableRepository::new(pool, dialect, &schema::SALES),
        }
    }

    // =========================================================================
    // Row Mapping
    // =========================================================================

    fn to_row(sale: &Sale) -> Row {
        Row::new()
            .with("ID_VENDA", sale.id_venda.as_str())
            .with("ID_CLIENTE", sale.id_cliente.as_str())
            .with("CLIENTE", sale.cliente.as_str())
            .with("MEIO", sale.meio.as_str())
            .with("DATA", sale.data.format("%Y-%m-%d").to_string())
            .with("VALOR_TOTAL_VENDA", sale.valor_total_venda)
    }

    fn from_row(row: &Row) -> DbResult<Sale> {
        let data_text = row.get_text("DATA")?;
        let data = NaiveDate::parse_from_str(&data_text, "%Y-%m-%d")
            .map_err(|e| DbError::Decode(format!("column DATA: {e}")))?;
        let meio = row.get_text("MEIO")?.parse()?;

        Ok(Sale {
            id_venda: row.get_text("ID_VENDA")?,
            id_cliente: row.get_text("ID_CLIENTE")?,
            cliente: row.get_opt_text("CLIENTE")?.unwrap_or_default(),
            meio,
            data,
            valor_total_venda: row.get_opt_real("VALOR_TOTAL_VENDA")?.unwrap_or(0.0),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id_venda: &str) -> DbResult<Option<Sale>> {
        let key = id_venda.trim().to_uppercase();
        let row = self.table.find_by_id(&SqlValue::from(key.as_str())).await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    pub async fn exists(&self, id_venda: &str) -> DbResult<bool> {
        Ok(self.get_by_id(id_venda).await?.is_some())
    }

    pub async fn get_all(&self) -> DbResult<Vec<Sale>> {
        self.table
            .find_all()
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    /// All sale ids, the snapshot [`next_id`](Self::next_id) derives from.
    pub async fn existing_ids(&self) -> DbResult<Vec<String>> {
        if !self.table.table_exists().await? {
            return Ok(Vec::new());
        }

        let d = self.table.dialect();
        let sql = format!(
            "SELECT {} FROM {}",
            d.quote_ident("ID_VENDA"),
            d.quote_ident("sales"),
        );
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(self.table.pool())
            .await?;
        Ok(ids)
    }

    /// The next free sale id (`VND001`, `VND002`, ...).
    pub async fn next_id(&self) -> DbResult<String> {
        Ok(ids::next_sale_id(self.existing_ids().await?))
    }

    /// All sales for one client, newest id first.
    pub async fn get_by_client(&self, id_cliente: &str) -> DbResult<Vec<Sale>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE UPPER({}) = UPPER({}) ORDER BY {} DESC",
            d.quote_ident("sales"),
            d.quote_ident("ID_CLIENTE"),
            d.placeholder(1),
            d.quote_ident("ID_VENDA"),
        );
        let rows = sqlx::query(&sql)
            .bind(id_cliente.trim())
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    /// Sales with `start <= DATA <= end`. ISO date text compares correctly.
    pub async fn get_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Sale>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {t} WHERE {col} >= {p1} AND {col} <= {p2} ORDER BY {col}",
            t = d.quote_ident("sales"),
            col = d.quote_ident("DATA"),
            p1 = d.placeholder(1),
            p2 = d.placeholder(2),
        );
        let rows = sqlx::query(&sql)
            .bind(start.format("%Y-%m-%d").to_string())
            .bind(end.format("%Y-%m-%d").to_string())
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.table.count().await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a sale header on the pool. Create-only.
    ///
    /// The coordinator does not use this; it writes headers through
    /// [`insert_in`](Self::insert_in) inside its transaction.
    pub async fn save(&self, sale: &Sale) -> DbResult<()> {
        if self.exists(&sale.id_venda).await? {
            return Err(DbError::duplicate("ID_VENDA", &sale.id_venda));
        }

        self.insert_row(&Self::to_row(sale), self.table.pool()).await?;
        info!(id_venda = %sale.id_venda, "sale header created");
        Ok(())
    }

    /// Inserts a header inside the caller's transaction.
    ///
    /// Plain insert, not an upsert: a colliding id (two terminals derived
    /// the same `VND###` from the same snapshot) must surface as a
    /// [`DbError::UniqueViolation`] so the caller retries, never overwrite
    /// the winner's sale.
    pub async fn insert_in(&self, conn: &mut AnyConnection, sale: &Sale) -> DbResult<()> {
        self.insert_row(&Self::to_row(sale), &mut *conn).await
    }

    async fn insert_row<'e, E>(&self, row: &Row, executor: E) -> DbResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Any>,
    {
        let d = self.table.dialect();
        let (columns, values): (Vec<&str>, Vec<&SqlValue>) = schema::SALES
            .columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (*c, v)))
            .unzip();

        let sql = d.insert("sales", &columns);
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        query.execute(executor).await?;
        Ok(())
    }

    /// Deletes a header; [`DbError::NotFound`] when the id is unknown.
    pub async fn delete(&self, id_venda: &str) -> DbResult<()> {
        let key = id_venda.trim().to_uppercase();
        self.table.delete(&SqlValue::from(key.as_str())).await
    }

    /// Deletes a header inside the caller's transaction. Returns how many
    /// rows went away (0 or 1).
    pub async fn delete_in(&self, conn: &mut AnyConnection, id_venda: &str) -> DbResult<u64> {
        let d = self.table.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            d.quote_ident("sales"),
            d.quote_ident("ID_VENDA"),
            d.placeholder(1),
        );
        let result = sqlx::query(&sql)
            .bind(id_venda.trim().to_uppercase())
            .execute(&mut *conn)
            .await?;
        debug!(id_venda, rows = result.rows_affected(), "sale header deleted");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Headline figures: count, revenue, average ticket, split by payment
    /// method.
    pub async fn get_summary(&self) -> DbResult<SalesSummary> {
        let d = self.table.dialect();

        let sql = format!(
            "SELECT COUNT(*) AS {n}, COALESCE(SUM({v}), 0) AS {t} FROM {s}",
            n = d.quote_ident("NUM"),
            v = d.quote_ident("VALOR_TOTAL_VENDA"),
            t = d.quote_ident("TOTAL"),
            s = d.quote_ident("sales"),
        );
        let raw = sqlx::query(&sql).fetch_one(self.table.pool()).await?;
        let head = decode_row(&raw)?;
        let total_sales = head.get_integer("NUM")?;
        let total_revenue = head.get_real("TOTAL")?;

        let sql = format!(
            "SELECT {m}, COALESCE(SUM({v}), 0) AS {t} FROM {s} \
             GROUP BY {m} ORDER BY {t} DESC",
            m = d.quote_ident("MEIO"),
            v = d.quote_ident("VALOR_TOTAL_VENDA"),
            t = d.quote_ident("TOTAL"),
            s = d.quote_ident("sales"),
        );
        let rows = sqlx::query(&sql).fetch_all(self.table.pool()).await?;
        let mut by_meio = Vec::with_capacity(rows.len());
        for raw in &rows {
            let row = decode_row(raw)?;
            by_meio.push(MeioRevenue {
                meio: row.get_opt_text("MEIO")?.unwrap_or_default(),
                revenue: row.get_real("TOTAL")?,
            });
        }

        Ok(SalesSummary {
            total_sales,
            total_revenue,
            average_sale: if total_sales > 0 {
                total_revenue / total_sales as f64
            } else {
                0.0
            },
            by_meio,
        })
    }

    /// Best sellers by quantity, from the item lines.
    pub async fn get_top_products(&self, limit: i64) -> DbResult<Vec<TopProduct>> {
        let d = self.table.dialect();
        // SUM over BIGINT widens to NUMERIC on PostgreSQL, which the Any
        // driver cannot decode; the CAST keeps it BIGINT on both engines.
        let sql = format!(
            "SELECT {c}, {p}, CAST(SUM({q}) AS BIGINT) AS {tq}, \
             COALESCE(SUM({pt}), 0) AS {tr} \
             FROM {s} GROUP BY {c}, {p} ORDER BY {tq} DESC LIMIT {ph}",
            c = d.quote_ident("CODIGO"),
            p = d.quote_ident("PRODUTO"),
            q = d.quote_ident("QUANTIDADE"),
            pt = d.quote_ident("PRECO_TOTAL"),
            tq = d.quote_ident("TOTAL_QTD"),
            tr = d.quote_ident("TOTAL_RECEITA"),
            s = d.quote_ident("sales_items"),
            ph = d.placeholder(1),
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(self.table.pool())
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for raw in &rows {
            let row = decode_row(raw)?;
            out.push(TopProduct {
                codigo: row.get_text("CODIGO")?,
                produto: row.get_opt_text("PRODUTO")?.unwrap_or_default(),
                total_quantidade: row.get_integer("TOTAL_QTD")?,
                total_revenue: row.get_real("TOTAL_RECEITA")?,
            });
        }
        Ok(out)
    }

    /// Highest-spending clients.
    pub async fn get_top_clients(&self, limit: i64) -> DbResult<Vec<TopClient>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT {ic}, {cl}, COUNT(*) AS {n}, COALESCE(SUM({v}), 0) AS {t} \
             FROM {s} GROUP BY {ic}, {cl} ORDER BY {t} DESC LIMIT {ph}",
            ic = d.quote_ident("ID_CLIENTE"),
            cl = d.quote_ident("CLIENTE"),
            n = d.quote_ident("NUM_COMPRAS"),
            v = d.quote_ident("VALOR_TOTAL_VENDA"),
            t = d.quote_ident("TOTAL_GASTO"),
            s = d.quote_ident("sales"),
            ph = d.placeholder(1),
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(self.table.pool())
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for raw in &rows {
            let row = decode_row(raw)?;
            out.push(TopClient {
                id_cliente: row.get_text("ID_CLIENTE")?,
                cliente: row.get_opt_text("CLIENTE")?.unwrap_or_default(),
                num_compras: row.get_integer("NUM_COMPRAS")?,
                total_gasto: row.get_real("TOTAL_GASTO")?,
            });
        }
        Ok(out)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use balcao_core::MeioPagamento;

    async fn db() -> Database {
        Database::connect(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    fn sale(id: &str, cliente_id: &str, dia: u32, total: f64) -> Sale {
        Sale::new(
            id,
            cliente_id,
            "Ana Souza",
            MeioPagamento::Pix,
            NaiveDate::from_ymd_opt(2026, 8, dia).unwrap(),
            total,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_roundtrip() {
        let repo = db().await.sales();
        repo.save(&sale("VND001", "CLI001", 10, 60.0)).await.unwrap();

        let found = repo.get_by_id("vnd001").await.unwrap().expect("sale");
        assert_eq!(found.id_cliente, "CLI001");
        assert_eq!(found.meio, MeioPagamento::Pix);
        assert_eq!(found.data, NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        assert!((found.valor_total_venda - 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_save_is_create_only() {
        let repo = db().await.sales();
        repo.save(&sale("VND001", "CLI001", 10, 60.0)).await.unwrap();

        let err = repo.save(&sale("VND001", "CLI002", 11, 10.0)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_next_id_and_filters() {
        let repo = db().await.sales();
        assert_eq!(repo.next_id().await.unwrap(), "VND001");

        repo.save(&sale("VND001", "CLI001", 10, 60.0)).await.unwrap();
        repo.save(&sale("VND003", "CLI001", 12, 30.0)).await.unwrap();
        repo.save(&sale("VND004", "CLI002", 20, 45.0)).await.unwrap();
        assert_eq!(repo.next_id().await.unwrap(), "VND005");

        let for_client = repo.get_by_client("cli001").await.unwrap();
        assert_eq!(for_client.len(), 2);
        assert_eq!(for_client[0].id_venda, "VND003");

        let mid_month = repo
            .get_by_date_range(
                NaiveDate::from_ymd_opt(2026, 8, 11).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(mid_month.len(), 1);
        assert_eq!(mid_month[0].id_venda, "VND003");
    }

    #[tokio::test]
    async fn test_summary_and_top_clients() {
        let repo = db().await.sales();
        repo.save(&sale("VND001", "CLI001", 10, 60.0)).await.unwrap();
        repo.save(&sale("VND002", "CLI001", 11, 40.0)).await.unwrap();
        let mut dinheiro = sale("VND003", "CLI002", 12, 25.0);
        dinheiro.meio = MeioPagamento::Dinheiro;
        repo.save(&dinheiro).await.unwrap();

        let summary = repo.get_summary().await.unwrap();
        assert_eq!(summary.total_sales, 3);
        assert!((summary.total_revenue - 125.0).abs() < 1e-9);
        assert!((summary.average_sale - 125.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.by_meio[0].meio, "pix");
        assert!((summary.by_meio[0].revenue - 100.0).abs() < 1e-9);

        let top = repo.get_top_clients(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id_cliente, "CLI001");
        assert_eq!(top[0].num_compras, 2);
        assert!((top[0].total_gasto - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_top_products_aggregates_quantities() {
        let db = db().await;
        let repo = db.sales();
        repo.save(&sale("VND001", "CLI001", 10, 70.0)).await.unwrap();
        repo.save(&sale("VND002", "CLI002", 11, 40.0)).await.unwrap();

        let item = |id: &str, codigo: &str, qty: i64| {
            balcao_core::SaleItem::new(id, "Aromatizador", "Casa", codigo, qty, 10.0).unwrap()
        };
        db.sale_items()
            .save_many(&[item("VND001", "ABR01", 3), item("VND001", "VEL01", 4)])
            .await
            .unwrap();
        db.sale_items()
            .save_many(&[item("VND002", "ABR01", 2)])
            .await
            .unwrap();

        let top = db.sales().get_top_products(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].codigo, "ABR01");
        assert_eq!(top[0].total_quantidade, 5);
        assert!((top[0].total_revenue - 50.0).abs() < 1e-9);
        assert_eq!(top[1].codigo, "VEL01");
        assert_eq!(top[1].total_quantidade, 4);

        let only_one = db.sales().get_top_products(1).await.unwrap();
        assert_eq!(only_one.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let repo = db().await.sales();
        let summary = repo.get_summary().await.unwrap();
        assert_eq!(summary.total_sales, 0);
        assert!((summary.average_sale).abs() < f64::EPSILON);
        assert!(summary.by_meio.is_empty());
    }
}
