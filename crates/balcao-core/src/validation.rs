//! # Validation Module
//!
//! Business rule validation for Balcão.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI / CLI (external)                                          │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by service + repositories)               │
//! │  ├── Required fields, positive amounts                                 │
//! │  ├── Enum membership (tipo, meio, faixa de idade)                      │
//! │  └── Tipo-conditional client rules                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database                                                     │
//! │  ├── PRIMARY KEY / UNIQUE constraints                                  │
//! │  └── Conditional stock UPDATE guard                                    │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::{ValidationError, ValidationResult};
use crate::types::Client;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a text field is present and non-blank.
pub fn validate_required(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Validates a product code (`CODIGO`).
///
/// ## Rules
/// - Must not be empty
/// - Only letters, digits, hyphens and underscores (codes are typed at the
///   counter; anything else is a typo)
pub fn validate_codigo(codigo: &str) -> ValidationResult<()> {
    let codigo = codigo.trim();

    if codigo.is_empty() {
        return Err(ValidationError::Required { field: "CODIGO" });
    }

    if !codigo
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "CODIGO",
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a sold quantity (`QUANTIDADE`), which must be strictly positive.
#[inline]
pub fn validate_quantidade(quantidade: i64) -> ValidationResult<()> {
    if quantidade <= 0 {
        return Err(ValidationError::MustBePositive { field: "QUANTIDADE" });
    }
    Ok(())
}

/// Validates a cost/price field that must be strictly positive and finite.
pub fn validate_positive_price(field: &'static str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if value <= 0.0 {
        return Err(ValidationError::MustBePositive { field });
    }
    Ok(())
}

// =============================================================================
// Date Parsing
// =============================================================================

/// Parses a sale date (`DATA`).
///
/// Accepts the legacy UI format `DD/MM/YYYY` and ISO `YYYY-MM-DD`; the
/// store always receives the ISO form.
pub fn parse_data(data: &str) -> ValidationResult<NaiveDate> {
    let data = data.trim();

    for fmt in ["%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(data, fmt) {
            return Ok(parsed);
        }
    }

    Err(ValidationError::InvalidFormat {
        field: "DATA",
        reason: format!("'{data}' is not a DD/MM/YYYY or YYYY-MM-DD date"),
    })
}

// =============================================================================
// Client Rules
// =============================================================================

/// Validates a client record, including the tipo-conditional rules.
///
/// ## Rules
/// ```text
/// always:          ID_CLIENTE and CLIENTE non-blank
/// tipo = pessoa:   IDADE and GENERO required
/// tipo = empresa:  CPF_CNPJ and ENDERECO required; IDADE/GENERO must be empty
/// ```
///
/// Callers that update a client must merge the stored record with the
/// requested changes and pass the merged result here, so a tipo flip is
/// checked against the full final state.
pub fn validate_client(client: &Client) -> ValidationResult<()> {
    validate_required("ID_CLIENTE", &client.id_cliente)?;
    validate_required("CLIENTE", &client.cliente)?;

    let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

    if client.is_empresa() {
        if blank(&client.cpf_cnpj) {
            return Err(ValidationError::Required { field: "CPF_CNPJ" });
        }
        if blank(&client.endereco) {
            return Err(ValidationError::Required { field: "ENDERECO" });
        }
        if client.idade.is_some() {
            return Err(ValidationError::MustBeEmpty {
                field: "IDADE",
                tipo: "empresa",
            });
        }
        if !blank(&client.genero) {
            return Err(ValidationError::MustBeEmpty {
                field: "GENERO",
                tipo: "empresa",
            });
        }
    } else {
        if client.idade.is_none() {
            return Err(ValidationError::Required { field: "IDADE" });
        }
        if blank(&client.genero) {
            return Err(ValidationError::Required { field: "GENERO" });
        }
    }

    Ok(())
}

/// Strips everything but digits from a CPF/CNPJ for comparison, so
/// `"12.345.678/0001-95"` and `"12345678000195"` match.
pub fn digits_only(cpf_cnpj: &str) -> String {
    cpf_cnpj.chars().filter(|c| c.is_ascii_digit()).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaixaIdade, TipoCliente};

    fn pessoa() -> Client {
        Client {
            id_cliente: "CLI001".to_string(),
            cliente: "João Silva".to_string(),
            vendedor: None,
            tipo: TipoCliente::Pessoa,
            idade: Some(FaixaIdade::De25a34),
            genero: Some("M".to_string()),
            profissao: None,
            cpf_cnpj: None,
            telefone: None,
            endereco: None,
        }
    }

    fn empresa() -> Client {
        Client {
            id_cliente: "CLI002".to_string(),
            cliente: "ABC Ltda".to_string(),
            vendedor: None,
            tipo: TipoCliente::Empresa,
            idade: None,
            genero: None,
            profissao: None,
            cpf_cnpj: Some("12.345.678/0001-95".to_string()),
            telefone: None,
            endereco: Some("Rua das Flores, 10".to_string()),
        }
    }

    #[test]
    fn test_pessoa_requires_idade_and_genero() {
        assert!(validate_client(&pessoa()).is_ok());

        let mut c = pessoa();
        c.idade = None;
        assert!(matches!(
            validate_client(&c),
            Err(ValidationError::Required { field: "IDADE" })
        ));

        let mut c = pessoa();
        c.genero = Some("  ".to_string());
        assert!(matches!(
            validate_client(&c),
            Err(ValidationError::Required { field: "GENERO" })
        ));
    }

    #[test]
    fn test_empresa_requires_cpf_and_endereco() {
        assert!(validate_client(&empresa()).is_ok());

        let mut c = empresa();
        c.cpf_cnpj = None;
        assert!(matches!(
            validate_client(&c),
            Err(ValidationError::Required { field: "CPF_CNPJ" })
        ));

        let mut c = empresa();
        c.endereco = Some(String::new());
        assert!(matches!(
            validate_client(&c),
            Err(ValidationError::Required { field: "ENDERECO" })
        ));
    }

    #[test]
    fn test_empresa_rejects_pessoa_fields() {
        let mut c = empresa();
        c.idade = Some(FaixaIdade::De35a44);
        assert!(matches!(
            validate_client(&c),
            Err(ValidationError::MustBeEmpty { field: "IDADE", .. })
        ));
    }

    #[test]
    fn test_parse_data_formats() {
        let d = parse_data("25/12/2025").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
        assert_eq!(parse_data("2025-12-25").unwrap(), d);
        assert!(parse_data("31/02/2025").is_err());
        assert!(parse_data("soon").is_err());
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("12.345.678/0001-95"), "12345678000195");
        assert_eq!(digits_only("123.456.789-00"), "12345678900");
    }

    #[test]
    fn test_validate_codigo() {
        assert!(validate_codigo("ABR01").is_ok());
        assert!(validate_codigo("ab-01_X").is_ok());
        assert!(validate_codigo("").is_err());
        assert!(validate_codigo("AB 01").is_err());
    }
}
