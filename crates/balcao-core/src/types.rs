//! # Domain Types
//!
//! Core domain types used throughout Balcão.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Client      │   │  Sale (header)  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  codigo (key)   │   │  id_cliente     │   │  id_venda       │       │
//! │  │  produto        │   │  tipo           │   │  id_cliente(FK) │       │
//! │  │  custo / valor  │   │  idade / genero │   │  meio, data     │       │
//! │  │  estoque        │   │  cpf_cnpj       │   │  valor_total    │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ 1:N            │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │  MeioPagamento  │   │   TipoCliente   │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pix, Dinheiro  │   │  Pessoa         │   │  codigo (FK)    │       │
//! │  │  Cartao, ...    │   │  Empresa        │   │  quantidade     │       │
//! │  └─────────────────┘   └─────────────────┘   │  preco_unit     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Pattern
//! Products carry a natural key (`codigo`, matched case-insensitively);
//! clients and sales carry generated sequential ids (`CLI001`, `VND001`,
//! see [`crate::ids`]). Sale items reference their header by `id_venda` and
//! their product by `codigo` — references, never ownership: products and
//! clients outlive any sale that mentions them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValidationError, ValidationResult};
use crate::validation;

// =============================================================================
// Client Type
// =============================================================================

/// Client kind: individual person or company.
///
/// The two kinds carry different mandatory fields, see [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoCliente {
    Pessoa,
    Empresa,
}

impl TipoCliente {
    pub const ALL: [TipoCliente; 2] = [TipoCliente::Pessoa, TipoCliente::Empresa];

    /// Canonical lowercase form, as persisted.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TipoCliente::Pessoa => "pessoa",
            TipoCliente::Empresa => "empresa",
        }
    }
}

impl FromStr for TipoCliente {
    type Err = ValidationError;

    /// Accepts any casing ("Pessoa", "PESSOA", "pessoa").
    fn from_str(s: &str) -> ValidationResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "pessoa" => Ok(TipoCliente::Pessoa),
            "empresa" => Ok(TipoCliente::Empresa),
            _ => Err(ValidationError::NotAllowed {
                field: "TIPO",
                allowed: vec!["pessoa", "empresa"],
            }),
        }
    }
}

impl fmt::Display for TipoCliente {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Age Bracket
// =============================================================================

/// Age bracket for individual (`pessoa`) clients.
///
/// Stored as the short display label (`"18-24"`, `">55"`, ...), which is what
/// the reporting layer groups on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaixaIdade {
    Menor18,
    De18a24,
    De25a34,
    De35a44,
    De45a54,
    Maior55,
    De65Mais,
}

impl FaixaIdade {
    pub const ALL: [FaixaIdade; 7] = [
        FaixaIdade::Menor18,
        FaixaIdade::De18a24,
        FaixaIdade::De25a34,
        FaixaIdade::De35a44,
        FaixaIdade::De45a54,
        FaixaIdade::Maior55,
        FaixaIdade::De65Mais,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            FaixaIdade::Menor18 => "<18",
            FaixaIdade::De18a24 => "18-24",
            FaixaIdade::De25a34 => "25-34",
            FaixaIdade::De35a44 => "35-44",
            FaixaIdade::De45a54 => "45-54",
            FaixaIdade::Maior55 => ">55",
            FaixaIdade::De65Mais => "65+",
        }
    }

    /// The list of valid labels, for error messages.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.as_str()).collect()
    }
}

impl FromStr for FaixaIdade {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "IDADE",
                allowed: FaixaIdade::labels(),
            })
    }
}

impl fmt::Display for FaixaIdade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment method for a sale (`MEIO` column).
///
/// Persisted as the lowercase accented form (`"cartão de crédito"`) for
/// compatibility with the reporting layer, which groups on the raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeioPagamento {
    Pix,
    Cartao,
    CartaoCredito,
    CartaoDebito,
    Dinheiro,
    Transferencia,
    Boleto,
}

impl MeioPagamento {
    pub const ALL: [MeioPagamento; 7] = [
        MeioPagamento::Pix,
        MeioPagamento::Cartao,
        MeioPagamento::CartaoCredito,
        MeioPagamento::CartaoDebito,
        MeioPagamento::Dinheiro,
        MeioPagamento::Transferencia,
        MeioPagamento::Boleto,
    ];

    /// Canonical persisted form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MeioPagamento::Pix => "pix",
            MeioPagamento::Cartao => "cartão",
            MeioPagamento::CartaoCredito => "cartão de crédito",
            MeioPagamento::CartaoDebito => "cartão de débito",
            MeioPagamento::Dinheiro => "dinheiro",
            MeioPagamento::Transferencia => "transferência",
            MeioPagamento::Boleto => "boleto",
        }
    }

    /// Human-facing label ("PIX", "Cartão de Crédito").
    pub fn display_name(&self) -> &'static str {
        match self {
            MeioPagamento::Pix => "PIX",
            MeioPagamento::Cartao => "Cartão",
            MeioPagamento::CartaoCredito => "Cartão de Crédito",
            MeioPagamento::CartaoDebito => "Cartão de Débito",
            MeioPagamento::Dinheiro => "Dinheiro",
            MeioPagamento::Transferencia => "Transferência",
            MeioPagamento::Boleto => "Boleto",
        }
    }

    /// The list of valid values, for error messages and UI pickers.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }
}

impl FromStr for MeioPagamento {
    type Err = ValidationError;

    /// Accepts the canonical accented form in any casing, plus the
    /// unaccented spellings terminals without a proper keyboard layout
    /// produce ("cartao de credito", "transferencia").
    fn from_str(s: &str) -> ValidationResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "pix" => Ok(MeioPagamento::Pix),
            "cartão" | "cartao" => Ok(MeioPagamento::Cartao),
            "cartão de crédito" | "cartao de credito" => Ok(MeioPagamento::CartaoCredito),
            "cartão de débito" | "cartao de debito" => Ok(MeioPagamento::CartaoDebito),
            "dinheiro" => Ok(MeioPagamento::Dinheiro),
            "transferência" | "transferencia" => Ok(MeioPagamento::Transferencia),
            "boleto" => Ok(MeioPagamento::Boleto),
            _ => Err(ValidationError::NotAllowed {
                field: "MEIO",
                allowed: MeioPagamento::labels(),
            }),
        }
    }
}

impl fmt::Display for MeioPagamento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Natural key, stored uppercase, matched case-insensitively.
    pub codigo: String,

    /// Display name.
    pub produto: String,

    /// Category label, used by reporting.
    pub categoria: String,

    /// Unit cost, must be > 0.
    pub custo: f64,

    /// Unit selling price, must be > 0.
    pub valor: f64,

    /// Stock on hand, never negative.
    pub estoque: i64,
}

impl Product {
    /// Builds a validated product. Normalizes `codigo` to uppercase and
    /// trims the text fields.
    pub fn new(
        codigo: &str,
        produto: &str,
        categoria: &str,
        custo: f64,
        valor: f64,
        estoque: i64,
    ) -> ValidationResult<Self> {
        validation::validate_codigo(codigo)?;
        validation::validate_required("PRODUTO", produto)?;
        validation::validate_required("CATEGORIA", categoria)?;
        validation::validate_positive_price("CUSTO", custo)?;
        validation::validate_positive_price("VALOR", valor)?;
        if estoque < 0 {
            return Err(ValidationError::CannotBeNegative { field: "ESTOQUE" });
        }

        Ok(Product {
            codigo: codigo.trim().to_uppercase(),
            produto: produto.trim().to_string(),
            categoria: categoria.trim().to_string(),
            custo,
            valor,
            estoque,
        })
    }

    /// Profit margin over cost, as a percentage.
    pub fn margin(&self) -> f64 {
        if self.custo == 0.0 {
            return 0.0;
        }
        (self.valor - self.custo) / self.custo * 100.0
    }

    /// Stock value at cost price.
    #[inline]
    pub fn inventory_value(&self) -> f64 {
        self.custo * self.estoque as f64
    }

    /// Stock value at selling price.
    #[inline]
    pub fn retail_value(&self) -> f64 {
        self.valor * self.estoque as f64
    }

    /// Whether `quantidade` units can be sold from current stock.
    #[inline]
    pub fn has_stock(&self, quantidade: i64) -> bool {
        self.estoque >= quantidade
    }
}

// =============================================================================
// Client
// =============================================================================

/// A client: an individual (`pessoa`) or a company (`empresa`).
///
/// ## Conditional Rules (enforced by [`crate::validation::validate_client`])
/// ```text
/// tipo = pessoa:   IDADE and GENERO required; CPF_CNPJ/ENDERECO optional
/// tipo = empresa:  CPF_CNPJ and ENDERECO required; IDADE/GENERO must be empty
/// ```
/// The rules re-run on every update against the merged (stored + requested)
/// record, so a tipo change cannot leave stale conditional fields behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Generated sequential id (`CLI001`, `CLI002`, ...).
    pub id_cliente: String,

    /// Client name (person or company name).
    pub cliente: String,

    /// Salesperson assigned to this client, if any.
    pub vendedor: Option<String>,

    pub tipo: TipoCliente,

    /// Age bracket; required for `pessoa`, must be absent for `empresa`.
    pub idade: Option<FaixaIdade>,

    /// Gender; required for `pessoa`, must be absent for `empresa`.
    pub genero: Option<String>,

    pub profissao: Option<String>,

    /// Tax id; required for `empresa`, optional for `pessoa`. Unique across
    /// clients when present (compared digits-only).
    pub cpf_cnpj: Option<String>,

    pub telefone: Option<String>,

    /// Address; required for `empresa`.
    pub endereco: Option<String>,
}

impl Client {
    #[inline]
    pub fn is_empresa(&self) -> bool {
        self.tipo == TipoCliente::Empresa
    }

    #[inline]
    pub fn is_pessoa(&self) -> bool {
        self.tipo == TipoCliente::Pessoa
    }

    /// Formatted name with type indicator, e.g. `"ABC Ltda (empresa)"`.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.cliente, self.tipo)
    }
}

// =============================================================================
// Sale (header)
// =============================================================================

/// A sale header. Line items live in [`SaleItem`], joined on `id_venda`.
///
/// `valor_total_venda` must equal the sum of the items' totals; the
/// coordinator establishes this procedurally at creation time and the two
/// are only ever written together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    /// Generated sequential id (`VND001`, `VND002`, ...).
    pub id_venda: String,

    /// Reference to the client, not ownership.
    pub id_cliente: String,

    /// Client name snapshot at sale time.
    pub cliente: String,

    pub meio: MeioPagamento,

    pub data: NaiveDate,

    /// Sum of the items' `preco_total`.
    pub valor_total_venda: f64,
}

impl Sale {
    /// Builds a validated sale header.
    pub fn new(
        id_venda: &str,
        id_cliente: &str,
        cliente: &str,
        meio: MeioPagamento,
        data: NaiveDate,
        valor_total_venda: f64,
    ) -> ValidationResult<Self> {
        validation::validate_required("ID_VENDA", id_venda)?;
        validation::validate_required("ID_CLIENTE", id_cliente)?;
        validation::validate_required("CLIENTE", cliente)?;
        if valor_total_venda < 0.0 {
            return Err(ValidationError::CannotBeNegative {
                field: "VALOR_TOTAL_VENDA",
            });
        }

        Ok(Sale {
            id_venda: id_venda.trim().to_uppercase(),
            id_cliente: id_cliente.trim().to_uppercase(),
            cliente: cliente.trim().to_string(),
            meio,
            data,
            valor_total_venda,
        })
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item of a sale.
///
/// ## Snapshot Pattern
/// `produto`, `categoria` and `preco_unit` are copied from the product at
/// sale time, so later product edits never rewrite sale history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    /// Reference to the sale header.
    pub id_venda: String,

    /// Product name at time of sale (frozen).
    pub produto: String,

    /// Category at time of sale (frozen).
    pub categoria: String,

    /// Reference to the product.
    pub codigo: String,

    /// Quantity sold, > 0.
    pub quantidade: i64,

    /// Unit price at time of sale (frozen), ≥ 0.
    pub preco_unit: f64,

    /// `quantidade × preco_unit`, derived.
    pub preco_total: f64,
}

impl SaleItem {
    /// Builds a validated item and derives `preco_total`.
    pub fn new(
        id_venda: &str,
        produto: &str,
        categoria: &str,
        codigo: &str,
        quantidade: i64,
        preco_unit: f64,
    ) -> ValidationResult<Self> {
        validation::validate_required("ID_VENDA", id_venda)?;
        validation::validate_required("PRODUTO", produto)?;
        validation::validate_required("CATEGORIA", categoria)?;
        validation::validate_codigo(codigo)?;
        validation::validate_quantidade(quantidade)?;
        if preco_unit < 0.0 {
            return Err(ValidationError::CannotBeNegative { field: "PRECO_UNIT" });
        }

        Ok(SaleItem {
            id_venda: id_venda.trim().to_uppercase(),
            produto: produto.trim().to_string(),
            categoria: categoria.trim().to_string(),
            codigo: codigo.trim().to_uppercase(),
            quantidade,
            preco_unit,
            preco_total: quantidade as f64 * preco_unit,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meio_parses_accented_and_plain() {
        assert_eq!(
            "cartão de crédito".parse::<MeioPagamento>().unwrap(),
            MeioPagamento::CartaoCredito
        );
        assert_eq!(
            "cartao de credito".parse::<MeioPagamento>().unwrap(),
            MeioPagamento::CartaoCredito
        );
        assert_eq!("PIX".parse::<MeioPagamento>().unwrap(), MeioPagamento::Pix);
        assert!("cheque".parse::<MeioPagamento>().is_err());
    }

    #[test]
    fn test_tipo_cliente_any_casing() {
        assert_eq!("Pessoa".parse::<TipoCliente>().unwrap(), TipoCliente::Pessoa);
        assert_eq!("EMPRESA".parse::<TipoCliente>().unwrap(), TipoCliente::Empresa);
        assert!("ong".parse::<TipoCliente>().is_err());
    }

    #[test]
    fn test_product_new_normalizes_and_validates() {
        let p = Product::new(" abr01 ", " Aromatizador ", "Casa", 8.0, 20.0, 10).unwrap();
        assert_eq!(p.codigo, "ABR01");
        assert_eq!(p.produto, "Aromatizador");

        assert!(Product::new("ABR01", "X", "C", 0.0, 20.0, 10).is_err());
        assert!(Product::new("ABR01", "X", "C", 8.0, -1.0, 10).is_err());
        assert!(Product::new("ABR01", "X", "C", 8.0, 20.0, -1).is_err());
    }

    #[test]
    fn test_sale_item_derives_total() {
        let item = SaleItem::new("VND001", "Aromatizador", "Casa", "abr01", 3, 20.0).unwrap();
        assert_eq!(item.codigo, "ABR01");
        assert!((item.preco_total - 60.0).abs() < f64::EPSILON);

        assert!(SaleItem::new("VND001", "X", "C", "ABR01", 0, 20.0).is_err());
        assert!(SaleItem::new("VND001", "X", "C", "ABR01", 1, -0.5).is_err());
    }

    #[test]
    fn test_faixa_idade_round_trips() {
        for faixa in FaixaIdade::ALL {
            assert_eq!(faixa.as_str().parse::<FaixaIdade>().unwrap(), faixa);
        }
        assert!("55-64".parse::<FaixaIdade>().is_err());
    }
}
