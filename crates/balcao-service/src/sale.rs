//! # Sale Coordinator
//!
//! Registering a sale touches three tables; this module is the only writer
//! that touches them together.
//!
//! ## Registration Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse + validate inputs (meio, data, non-empty items)              │
//! │  2. Resolve client                      ── reads, on the pool          │
//! │  3. Resolve products, snapshot prices, pre-check stock                 │
//! │  4. Derive one shared ID_VENDA                                         │
//! │  ───────────────────────────── BEGIN ─────────────────────────────────  │
//! │  5. Insert header                                                      │
//! │  6. Insert all items                                                   │
//! │  7. Conditional stock decrement per item                               │
//! │  ───────────────────────────── COMMIT ────────────────────────────────  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pre-check in step 3 exists for a friendly early error with the
//! product's name in it; the decrement in step 7 is what actually
//! guarantees stock never goes negative. If a concurrent sale wins the
//! race between the two, the decrement matches no row and the whole
//! transaction rolls back; no header, item, or stock change survives.
//!
//! Cancellation is the mirror image, in one transaction as well: restore
//! stock (skipping products deleted since the sale), delete the items,
//! delete the header.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use balcao_core::{validation, MeioPagamento, Sale, SaleItem, ValidationError};
use balcao_db::{Database, DbError};

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Request / Receipt DTOs
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemRequest {
    pub codigo: String,
    pub quantidade: i64,
    /// Price override (negotiated discount). `None` snapshots the product's
    /// current selling price.
    pub preco_unit: Option<f64>,
}

impl SaleItemRequest {
    pub fn new(codigo: &str, quantidade: i64) -> Self {
        SaleItemRequest {
            codigo: codigo.to_string(),
            quantidade,
            preco_unit: None,
        }
    }

    pub fn with_price(mut self, preco_unit: f64) -> Self {
        self.preco_unit = Some(preco_unit);
        self
    }
}

/// A sale registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    pub id_cliente: String,
    /// Payment method label, accented or not ("pix", "cartao de credito").
    pub meio: String,
    /// Sale date, `DD/MM/YYYY` or `YYYY-MM-DD`. `None` means today.
    pub data: Option<String>,
    pub items: Vec<SaleItemRequest>,
}

/// What a successful registration hands back.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub id_venda: String,
    pub data: NaiveDate,
    pub item_count: usize,
    pub total_quantidade: i64,
    pub valor_total: f64,
}

/// What a successful cancellation hands back.
#[derive(Debug, Clone, Serialize)]
pub struct CancelReceipt {
    pub id_venda: String,
    pub items_removed: u64,
    /// How many item lines had their stock put back. Lower than
    /// `items_removed` when products were deleted after the sale.
    pub items_restocked: usize,
}

// =============================================================================
// Service
// =============================================================================

/// Coordinates multi-table sale writes.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Payment method labels for UI pickers.
    pub fn available_payment_methods() -> Vec<&'static str> {
        MeioPagamento::labels()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a sale: one header, one item line per product, stock
    /// decremented, all in one transaction.
    pub async fn register_sale(&self, request: &SaleRequest) -> ServiceResult<SaleReceipt> {
        let meio: MeioPagamento = request.meio.parse()?;
        let data = match &request.data {
            Some(text) => validation::parse_data(text)?,
            None => Local::now().date_naive(),
        };
        if request.items.is_empty() {
            return Err(ValidationError::Required { field: "ITENS" }.into());
        }

        let clients = self.db.clients();
        let products = self.db.products();
        let sales = self.db.sales();
        let sale_items = self.db.sale_items();

        let client = clients
            .get_by_id(&request.id_cliente)
            .await?
            .ok_or_else(|| ServiceError::ClientNotFound(request.id_cliente.clone()))?;

        // Resolve each line against live inventory and freeze its price.
        let mut priced = Vec::with_capacity(request.items.len());
        for item in &request.items {
            validation::validate_quantidade(item.quantidade)?;

            let product = products
                .get_by_codigo(&item.codigo)
                .await?
                .ok_or_else(|| ServiceError::ProductNotFound(item.codigo.clone()))?;

            if !product.has_stock(item.quantidade) {
                return Err(ServiceError::InsufficientStock {
                    produto: product.produto,
                    available: product.estoque,
                    requested: item.quantidade,
                });
            }

            let preco_unit = item.preco_unit.unwrap_or(product.valor);
            priced.push((product, item.quantidade, preco_unit));
        }

        // One shared id across the header and every line.
        let id_venda = sales.next_id().await?;

        let mut lines = Vec::with_capacity(priced.len());
        for (product, quantidade, preco_unit) in &priced {
            lines.push(SaleItem::new(
                &id_venda,
                &product.produto,
                &product.categoria,
                &product.codigo,
                *quantidade,
                *preco_unit,
            )?);
        }
        let valor_total: f64 = lines.iter().map(|l| l.preco_total).sum();
        let sale = Sale::new(
            &id_venda,
            &client.id_cliente,
            &client.cliente,
            meio,
            data,
            valor_total,
        )?;

        let mut tx = self.db.begin().await?;
        sales.insert_in(&mut tx, &sale).await?;
        sale_items.save_many_in(&mut tx, &lines).await?;

        for line in &lines {
            let adjusted = products
                .adjust_stock_in(&mut tx, &line.codigo, -line.quantidade)
                .await?;
            if !adjusted {
                // A concurrent sale won the race since the pre-check.
                tx.rollback().await.map_err(DbError::from)?;
                return Err(self.stock_failure(&line.codigo, line.quantidade).await?);
            }
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id_venda = %sale.id_venda,
            id_cliente = %sale.id_cliente,
            items = lines.len(),
            valor_total = sale.valor_total_venda,
            "sale registered"
        );

        Ok(SaleReceipt {
            id_venda: sale.id_venda,
            data: sale.data,
            item_count: lines.len(),
            total_quantidade: lines.iter().map(|l| l.quantidade).sum(),
            valor_total,
        })
    }

    /// Convenience wrapper for the common one-product counter sale.
    ///
    /// `preco_unit` overrides the snapshot price (negotiated discount);
    /// `data` accepts `DD/MM/YYYY` or ISO and defaults to today.
    pub async fn register_sale_single_item(
        &self,
        id_cliente: &str,
        codigo: &str,
        quantidade: i64,
        meio: &str,
        preco_unit: Option<f64>,
        data: Option<&str>,
    ) -> ServiceResult<SaleReceipt> {
        let mut item = SaleItemRequest::new(codigo, quantidade);
        item.preco_unit = preco_unit;

        self.register_sale(&SaleRequest {
            id_cliente: id_cliente.to_string(),
            meio: meio.to_string(),
            data: data.map(str::to_string),
            items: vec![item],
        })
        .await
    }

    /// Re-reads the product after a failed decrement to tell "sold out"
    /// from "deleted meanwhile".
    async fn stock_failure(&self, codigo: &str, requested: i64) -> ServiceResult<ServiceError> {
        Ok(match self.db.products().get_by_codigo(codigo).await? {
            Some(product) => ServiceError::InsufficientStock {
                produto: product.produto,
                available: product.estoque,
                requested,
            },
            None => ServiceError::ProductNotFound(codigo.to_string()),
        })
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancels a sale: optionally restores stock, then removes the items
    /// and the header, all in one transaction.
    ///
    /// Products deleted since the sale are skipped during restock with a
    /// warning; the cancellation itself still goes through.
    pub async fn cancel_sale(
        &self,
        id_venda: &str,
        restore_stock: bool,
    ) -> ServiceResult<CancelReceipt> {
        let key = id_venda.trim().to_uppercase();

        let sales = self.db.sales();
        let sale_items = self.db.sale_items();
        let products = self.db.products();

        let items = sale_items.get_by_sale_id(&key).await?;
        if !sales.exists(&key).await? && items.is_empty() {
            return Err(ServiceError::SaleNotFound(key));
        }

        let mut tx = self.db.begin().await?;

        let mut items_restocked = 0;
        if restore_stock {
            for item in &items {
                let restored = products
                    .adjust_stock_in(&mut tx, &item.codigo, item.quantidade)
                    .await?;
                if restored {
                    items_restocked += 1;
                } else {
                    warn!(
                        id_venda = %key,
                        codigo = %item.codigo,
                        quantidade = item.quantidade,
                        "product no longer exists, stock not restored"
                    );
                }
            }
        }

        let items_removed = sale_items.delete_by_sale_id_in(&mut tx, &key).await?;
        sales.delete_in(&mut tx, &key).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id_venda = %key,
            items_removed,
            items_restocked,
            restore_stock,
            "sale cancelled"
        );

        Ok(CancelReceipt {
            id_venda: key,
            items_removed,
            items_restocked,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A sale header with its line items.
    pub async fn get_sale_group(&self, id_venda: &str) -> ServiceResult<(Sale, Vec<SaleItem>)> {
        let key = id_venda.trim().to_uppercase();
        let sale = self
            .db
            .sales()
            .get_by_id(&key)
            .await?
            .ok_or_else(|| ServiceError::SaleNotFound(key.clone()))?;
        let items = self.db.sale_items().get_by_sale_id(&key).await?;
        Ok((sale, items))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_core::{Client, FaixaIdade, Product, TipoCliente};
    use balcao_db::DbConfig;

    async fn service() -> SaleService {
        let db = Database::connect(DbConfig::in_memory())
            .await
            .expect("in-memory database");

        db.products()
            .save(&Product::new("ABR01", "Aromatizador Lavanda", "Aromatizadores", 8.0, 20.0, 10).unwrap())
            .await
            .unwrap();
        db.products()
            .save(&Product::new("VEL01", "Vela Canela", "Velas", 6.0, 15.0, 2).unwrap())
            .await
            .unwrap();
        db.clients()
            .save(&Client {
                id_cliente: "CLI001".to_string(),
                cliente: "Ana Souza".to_string(),
                vendedor: None,
                tipo: TipoCliente::Pessoa,
                idade: Some(FaixaIdade::De25a34),
                genero: Some("F".to_string()),
                profissao: None,
                cpf_cnpj: None,
                telefone: None,
                endereco: None,
            })
            .await
            .unwrap();

        SaleService::new(db)
    }

    fn request(items: Vec<SaleItemRequest>) -> SaleRequest {
        SaleRequest {
            id_cliente: "CLI001".to_string(),
            meio: "pix".to_string(),
            data: Some("25/08/2026".to_string()),
            items,
        }
    }

    async fn stock_of(service: &SaleService, codigo: &str) -> i64 {
        service
            .database()
            .products()
            .get_by_codigo(codigo)
            .await
            .unwrap()
            .expect("product")
            .estoque
    }

    #[tokio::test]
    async fn test_register_multi_item_sale() {
        let svc = service().await;
        let receipt = svc
            .register_sale(&request(vec![
                SaleItemRequest::new("abr01", 3),
                SaleItemRequest::new("VEL01", 1),
            ]))
            .await
            .unwrap();

        assert_eq!(receipt.id_venda, "VND001");
        assert_eq!(receipt.item_count, 2);
        assert_eq!(receipt.total_quantidade, 4);
        assert!((receipt.valor_total - (3.0 * 20.0 + 15.0)).abs() < 1e-9);
        assert_eq!(receipt.data, NaiveDate::from_ymd_opt(2026, 8, 25).unwrap());

        // Header and items share the id; the header total equals the item sum.
        let (sale, items) = svc.get_sale_group("VND001").await.unwrap();
        assert_eq!(sale.meio, MeioPagamento::Pix);
        assert_eq!(sale.cliente, "Ana Souza");
        assert_eq!(items.len(), 2);
        let item_sum: f64 = items.iter().map(|i| i.preco_total).sum();
        assert!((sale.valor_total_venda - item_sum).abs() < 1e-9);
        assert!(items.iter().all(|i| i.id_venda == "VND001"));

        // Stock went down by exactly the sold quantities.
        assert_eq!(stock_of(&svc, "ABR01").await, 7);
        assert_eq!(stock_of(&svc, "VEL01").await, 1);
    }

    #[tokio::test]
    async fn test_sequential_ids_across_sales() {
        let svc = service().await;
        let first = svc
            .register_sale_single_item("CLI001", "ABR01", 1, "dinheiro", None, None)
            .await
            .unwrap();
        let second = svc
            .register_sale_single_item("CLI001", "ABR01", 1, "cartao de credito", None, None)
            .await
            .unwrap();

        assert_eq!(first.id_venda, "VND001");
        assert_eq!(second.id_venda, "VND002");

        let (sale, _) = svc.get_sale_group("VND002").await.unwrap();
        assert_eq!(sale.meio, MeioPagamento::CartaoCredito);
    }

    #[tokio::test]
    async fn test_price_override_is_snapshotted() {
        let svc = service().await;
        svc.register_sale(&request(vec![
            SaleItemRequest::new("ABR01", 2).with_price(18.5),
        ]))
        .await
        .unwrap();

        let (sale, items) = svc.get_sale_group("VND001").await.unwrap();
        assert!((items[0].preco_unit - 18.5).abs() < 1e-9);
        assert!((sale.valor_total_venda - 37.0).abs() < 1e-9);

        // Later product edits do not rewrite the frozen snapshot.
        svc.database()
            .products()
            .update("ABR01", &balcao_db::Row::new().with("VALOR", 99.0))
            .await
            .unwrap();
        let (_, items) = svc.get_sale_group("VND001").await.unwrap();
        assert!((items[0].preco_unit - 18.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_nothing_behind() {
        let svc = service().await;
        let err = svc
            .register_sale(&request(vec![
                SaleItemRequest::new("ABR01", 1),
                SaleItemRequest::new("VEL01", 5),
            ]))
            .await
            .unwrap_err();

        match err {
            ServiceError::InsufficientStock {
                produto,
                available,
                requested,
            } => {
                assert_eq!(produto, "Vela Canela");
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No header, no items, no partial decrement.
        assert_eq!(svc.database().sales().count().await.unwrap(), 0);
        assert_eq!(svc.database().sale_items().count().await.unwrap(), 0);
        assert_eq!(stock_of(&svc, "ABR01").await, 10);
        assert_eq!(stock_of(&svc, "VEL01").await, 2);
    }

    #[tokio::test]
    async fn test_unknown_client_and_product() {
        let svc = service().await;

        let mut req = request(vec![SaleItemRequest::new("ABR01", 1)]);
        req.id_cliente = "CLI999".to_string();
        assert!(matches!(
            svc.register_sale(&req).await.unwrap_err(),
            ServiceError::ClientNotFound(_)
        ));

        let err = svc
            .register_sale(&request(vec![SaleItemRequest::new("GHOST", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProductNotFound(_)));
        assert_eq!(svc.database().sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_input_validation() {
        let svc = service().await;

        // Empty item list.
        assert!(matches!(
            svc.register_sale(&request(vec![])).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        // Non-positive quantity.
        assert!(matches!(
            svc.register_sale(&request(vec![SaleItemRequest::new("ABR01", 0)]))
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));

        // Unknown payment method.
        let mut req = request(vec![SaleItemRequest::new("ABR01", 1)]);
        req.meio = "cheque".to_string();
        assert!(matches!(
            svc.register_sale(&req).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        // Unparsable date.
        let mut req = request(vec![SaleItemRequest::new("ABR01", 1)]);
        req.data = Some("31/02/2026".to_string());
        assert!(matches!(
            svc.register_sale(&req).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let svc = service().await;
        svc.register_sale(&request(vec![
            SaleItemRequest::new("ABR01", 3),
            SaleItemRequest::new("VEL01", 1),
        ]))
        .await
        .unwrap();
        assert_eq!(stock_of(&svc, "ABR01").await, 7);

        let receipt = svc.cancel_sale("vnd001", true).await.unwrap();
        assert_eq!(receipt.id_venda, "VND001");
        assert_eq!(receipt.items_removed, 2);
        assert_eq!(receipt.items_restocked, 2);

        assert_eq!(stock_of(&svc, "ABR01").await, 10);
        assert_eq!(stock_of(&svc, "VEL01").await, 2);
        assert!(!svc.database().sales().exists("VND001").await.unwrap());
        assert_eq!(svc.database().sale_items().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_without_restock() {
        let svc = service().await;
        svc.register_sale_single_item("CLI001", "ABR01", 4, "pix", None, None)
            .await
            .unwrap();

        let receipt = svc.cancel_sale("VND001", false).await.unwrap();
        assert_eq!(receipt.items_removed, 1);
        assert_eq!(receipt.items_restocked, 0);
        assert_eq!(stock_of(&svc, "ABR01").await, 6);
    }

    #[tokio::test]
    async fn test_cancel_skips_deleted_product() {
        let svc = service().await;
        svc.register_sale(&request(vec![
            SaleItemRequest::new("ABR01", 2),
            SaleItemRequest::new("VEL01", 1),
        ]))
        .await
        .unwrap();

        svc.database().products().delete("VEL01").await.unwrap();

        let receipt = svc.cancel_sale("VND001", true).await.unwrap();
        assert_eq!(receipt.items_removed, 2);
        assert_eq!(receipt.items_restocked, 1);
        assert_eq!(stock_of(&svc, "ABR01").await, 10);
        assert!(!svc.database().sales().exists("VND001").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_unknown_sale() {
        let svc = service().await;
        assert!(matches!(
            svc.cancel_sale("VND999", true).await.unwrap_err(),
            ServiceError::SaleNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_id_freed_by_cancellation_is_reused() {
        let svc = service().await;
        svc.register_sale_single_item("CLI001", "ABR01", 1, "pix", None, None)
            .await
            .unwrap();
        svc.cancel_sale("VND001", true).await.unwrap();

        // The snapshot-derived generator hands the freed id out again.
        let receipt = svc
            .register_sale_single_item("CLI001", "ABR01", 1, "pix", None, None)
            .await
            .unwrap();
        assert_eq!(receipt.id_venda, "VND001");
    }

    #[tokio::test]
    async fn test_single_item_wrapper_carries_price_and_date() {
        let svc = service().await;
        let receipt = svc
            .register_sale_single_item(
                "CLI001",
                "ABR01",
                2,
                "pix",
                Some(17.5),
                Some("10/08/2026"),
            )
            .await
            .unwrap();

        assert_eq!(receipt.data, NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        assert!((receipt.valor_total - 35.0).abs() < 1e-9);

        let (sale, items) = svc.get_sale_group(&receipt.id_venda).await.unwrap();
        assert_eq!(sale.data, receipt.data);
        assert!((items[0].preco_unit - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_available_payment_methods() {
        let methods = SaleService::available_payment_methods();
        assert!(methods.contains(&"pix"));
        assert!(methods.contains(&"cartão de crédito"));
        assert_eq!(methods.len(), 7);
    }
}
