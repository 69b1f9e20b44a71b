//! # Client Repository
//!
//! Client records with tipo-conditional rules and a digits-only CPF/CNPJ
//! uniqueness guard.
//!
//! ## Update Semantics
//! Updates are merge-then-revalidate: the stored record is merged with the
//! requested changes and the full merged result goes back through
//! [`balcao_core::validation::validate_client`]. A tipo flip therefore
//! cannot leave stale conditional fields behind: flipping a `pessoa` to
//! `empresa` is rejected until the request also clears `IDADE`/`GENERO` and
//! supplies `CPF_CNPJ`/`ENDERECO`. Clearing a field means sending a blank
//! string, which the row layer normalizes to `NULL`.

use sqlx::AnyPool;
use tracing::{debug, info};

use balcao_core::validation::{digits_only, validate_client};
use balcao_core::{ids, Client, ValidationError};

use crate::dialect::SqlDialect;
use crate::error::{DbError, DbResult};
use crate::repository::core::TableRepository;
use crate::schema;
use crate::value::{decode_row, Row, SqlValue};

// =============================================================================
// Repository
// =============================================================================

/// Repository for client operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    table: TableRepository,
}

impl ClientRepository {
    pub(crate) fn new(pool: AnyPool, dialect: &'static dyn SqlDialect) -> Self {
        ClientRepository {
            table: TableRepository::new(pool, dialect, &schema::CLIENTS),
        }
    }

    // =========================================================================
    // Row Mapping
    // =========================================================================

    fn to_row(client: &Client) -> Row {
        Row::new()
            .with("ID_CLIENTE", client.id_cliente.as_str())
            .with("CLIENTE", client.cliente.as_str())
            .with("VENDEDOR", client.vendedor.clone())
            .with("TIPO", client.tipo.as_str())
            .with("IDADE", client.idade.map(|f| f.as_str().to_string()))
            .with("GENERO", client.genero.clone())
            .with("PROFISSAO", client.profissao.clone())
            .with("CPF_CNPJ", client.cpf_cnpj.clone())
            .with("TELEFONE", client.telefone.clone())
            .with("ENDERECO", client.endereco.clone())
    }

    fn from_row(row: &Row) -> DbResult<Client> {
        let tipo = row
            .get_opt_text("TIPO")?
            .unwrap_or_else(|| "pessoa".to_string())
            .parse()?;
        let idade = row
            .get_opt_text("IDADE")?
            .map(|s| s.parse())
            .transpose()?;

        Ok(Client {
            id_cliente: row.get_text("ID_CLIENTE")?,
            cliente: row.get_text("CLIENTE")?,
            vendedor: row.get_opt_text("VENDEDOR")?,
            tipo,
            idade,
            genero: row.get_opt_text("GENERO")?,
            profissao: row.get_opt_text("PROFISSAO")?,
            cpf_cnpj: row.get_opt_text("CPF_CNPJ")?,
            telefone: row.get_opt_text("TELEFONE")?,
            endereco: row.get_opt_text("ENDERECO")?,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id_cliente: &str) -> DbResult<Option<Client>> {
        let key = id_cliente.trim().to_uppercase();
        let row = self.table.find_by_id(&SqlValue::from(key.as_str())).await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    pub async fn exists(&self, id_cliente: &str) -> DbResult<bool> {
        Ok(self.get_by_id(id_cliente).await?.is_some())
    }

    pub async fn get_all(&self) -> DbResult<Vec<Client>> {
        self.table
            .find_all()
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    /// All client ids, the snapshot [`next_id`](Self::next_id) derives from.
    pub async fn existing_ids(&self) -> DbResult<Vec<String>> {
        if !self.table.table_exists().await? {
            return Ok(Vec::new());
        }

        let d = self.table.dialect();
        let sql = format!(
            "SELECT {} FROM {}",
            d.quote_ident("ID_CLIENTE"),
            d.quote_ident("clients"),
        );
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(self.table.pool())
            .await?;
        Ok(ids)
    }

    /// The next free client id (`CLI001`, `CLI002`, ...).
    pub async fn next_id(&self) -> DbResult<String> {
        Ok(ids::next_client_id(self.existing_ids().await?))
    }

    /// Clients whose name contains `term`, case-insensitively.
    pub async fn search_by_name(&self, term: &str) -> DbResult<Vec<Client>> {
        let d = self.table.dialect();
        let sql = format!(
            "SELECT * FROM {} WHERE UPPER({}) LIKE UPPER({}) ORDER BY {}",
            d.quote_ident("clients"),
            d.quote_ident("CLIENTE"),
            d.placeholder(1),
            d.quote_ident("CLIENTE"),
        );
        let rows = sqlx::query(&sql)
            .bind(format!("%{}%", term.trim()))
            .fetch_all(self.table.pool())
            .await?;
        rows.iter()
            .map(|r| Self::from_row(&decode_row(r)?))
            .collect()
    }

    /// Finds the client holding this tax id, compared digits-only so
    /// formatting differences don't hide a duplicate.
    pub async fn get_by_cpf_cnpj(&self, cpf_cnpj: &str) -> DbResult<Option<Client>> {
        let target = digits_only(cpf_cnpj);
        if target.is_empty() {
            return Ok(None);
        }

        for client in self.get_all().await? {
            if let Some(stored) = &client.cpf_cnpj {
                if digits_only(stored) == target {
                    return Ok(Some(client));
                }
            }
        }
        Ok(None)
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.table.count().await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a new client. Create-only; both the id and the tax id must
    /// be free.
    pub async fn save(&self, client: &Client) -> DbResult<()> {
        validate_client(client)?;

        if self.exists(&client.id_cliente).await? {
            return Err(DbError::duplicate("ID_CLIENTE", &client.id_cliente));
        }
        if let Some(cpf) = &client.cpf_cnpj {
            if let Some(holder) = self.get_by_cpf_cnpj(cpf).await? {
                return Err(DbError::duplicate("CPF_CNPJ", holder.cpf_cnpj.unwrap_or_default()));
            }
        }

        self.table.insert(&Self::to_row(client)).await?;
        info!(id_cliente = %client.id_cliente, tipo = %client.tipo, "client created");
        Ok(())
    }

    /// Applies field updates to an existing client, merge-then-revalidate.
    ///
    /// `ID_CLIENTE` is immutable. Blank strings clear optional fields.
    pub async fn update(&self, id_cliente: &str, updates: &Row) -> DbResult<()> {
        if updates.contains("ID_CLIENTE") {
            return Err(ValidationError::InvalidFormat {
                field: "ID_CLIENTE",
                reason: "cannot be changed after creation".to_string(),
            }
            .into());
        }

        let key = id_cliente.trim().to_uppercase();
        let current = self
            .get_by_id(&key)
            .await?
            .ok_or_else(|| DbError::not_found("client", key.clone()))?;

        // Merge stored + requested, then re-run the full rule set.
        let mut merged_row = Self::to_row(&current);
        for (column, value) in updates.iter() {
            if schema::CLIENTS.has_column(column) {
                merged_row.set(column, value.clone());
            }
        }
        let merged = Self::from_row(&merged_row)?;
        validate_client(&merged)?;

        if let Some(cpf) = &merged.cpf_cnpj {
            if let Some(holder) = self.get_by_cpf_cnpj(cpf).await? {
                if holder.id_cliente != merged.id_cliente {
                    return Err(DbError::duplicate("CPF_CNPJ", cpf.clone()));
                }
            }
        }

        // Write the full merged record so TIPO casing and cleared fields
        // land normalized.
        merged_row.remove("ID_CLIENTE");
        self.table
            .update(&SqlValue::from(key.as_str()), &merged_row)
            .await?;
        debug!(id_cliente = %key, fields = updates.len(), "client updated");
        Ok(())
    }

    /// Deletes a client; [`DbError::NotFound`] when the id is unknown.
    /// Sale history keeps its client snapshot either way.
    pub async fn delete(&self, id_cliente: &str) -> DbResult<()> {
        let key = id_cliente.trim().to_uppercase();
        self.table.delete(&SqlValue::from(key.as_str())).await?;
        info!(id_cliente = %key, "client deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use balcao_core::{FaixaIdade, TipoCliente};

    async fn db() -> Database {
        Database::connect(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    fn pessoa(id: &str, nome: &str) -> Client {
        Client {
            id_cliente: id.to_string(),
            cliente: nome.to_string(),
            vendedor: None,
            tipo: TipoCliente::Pessoa,
            idade: Some(FaixaIdade::De25a34),
            genero: Some("F".to_string()),
            profissao: Some("arquiteta".to_string()),
            cpf_cnpj: Some("123.456.789-00".to_string()),
            telefone: None,
            endereco: None,
        }
    }

    fn empresa(id: &str) -> Client {
        Client {
            id_cliente: id.to_string(),
            cliente: "ABC Ltda".to_string(),
            vendedor: Some("Paula".to_string()),
            tipo: TipoCliente::Empresa,
            idade: None,
            genero: None,
            profissao: None,
            cpf_cnpj: Some("12.345.678/0001-95".to_string()),
            telefone: Some("11 99999-0000".to_string()),
            endereco: Some("Rua das Flores, 10".to_string()),
        }
    }

    #[tokio::test]
    async fn test_save_and_roundtrip() {
        let repo = db().await.clients();
        repo.save(&pessoa("CLI001", "Ana Souza")).await.unwrap();

        let found = repo.get_by_id("cli001").await.unwrap().expect("client");
        assert_eq!(found.cliente, "Ana Souza");
        assert_eq!(found.tipo, TipoCliente::Pessoa);
        assert_eq!(found.idade, Some(FaixaIdade::De25a34));
        assert_eq!(found.telefone, None);
    }

    #[tokio::test]
    async fn test_next_id_follows_existing() {
        let repo = db().await.clients();
        assert_eq!(repo.next_id().await.unwrap(), "CLI001");

        repo.save(&pessoa("CLI001", "Ana")).await.unwrap();
        repo.save(&empresa("CLI005")).await.unwrap();
        assert_eq!(repo.next_id().await.unwrap(), "CLI006");
    }

    #[tokio::test]
    async fn test_duplicate_guards() {
        let repo = db().await.clients();
        repo.save(&pessoa("CLI001", "Ana")).await.unwrap();

        let err = repo.save(&pessoa("CLI001", "Outra")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { field: "ID_CLIENTE", .. }
        ));

        // Same tax id, different formatting, different client id.
        let mut twin = pessoa("CLI002", "Gêmea");
        twin.cpf_cnpj = Some("12345678900".to_string());
        let err = repo.save(&twin).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { field: "CPF_CNPJ", .. }
        ));
    }

    #[tokio::test]
    async fn test_update_merges_and_revalidates() {
        let repo = db().await.clients();
        repo.save(&pessoa("CLI001", "Ana")).await.unwrap();

        // A plain field update keeps everything else.
        repo.update("CLI001", &Row::new().with("TELEFONE", "11 98888-7777"))
            .await
            .unwrap();
        let c = repo.get_by_id("CLI001").await.unwrap().unwrap();
        assert_eq!(c.telefone.as_deref(), Some("11 98888-7777"));
        assert_eq!(c.idade, Some(FaixaIdade::De25a34));

        // Flipping tipo without clearing pessoa fields is rejected.
        let err = repo
            .update("CLI001", &Row::new().with("TIPO", "empresa"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        // The full flip works when the request clears and supplies fields.
        repo.update(
            "CLI001",
            &Row::new()
                .with("TIPO", "empresa")
                .with("IDADE", "")
                .with("GENERO", "")
                .with("ENDERECO", "Av. Central, 100"),
        )
        .await
        .unwrap();
        let c = repo.get_by_id("CLI001").await.unwrap().unwrap();
        assert_eq!(c.tipo, TipoCliente::Empresa);
        assert_eq!(c.idade, None);
        assert_eq!(c.genero, None);
    }

    #[tokio::test]
    async fn test_update_unknown_client_and_immutable_id() {
        let repo = db().await.clients();
        assert!(repo
            .update("CLI999", &Row::new().with("TELEFONE", "x"))
            .await
            .unwrap_err()
            .is_not_found());

        repo.save(&pessoa("CLI001", "Ana")).await.unwrap();
        assert!(repo
            .update("CLI001", &Row::new().with("ID_CLIENTE", "CLI002"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let repo = db().await.clients();
        repo.save(&pessoa("CLI001", "Ana Souza")).await.unwrap();
        repo.save(&empresa("CLI002")).await.unwrap();

        let hits = repo.search_by_name("souza").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id_cliente, "CLI001");
        assert!(repo.search_by_name("xyz").await.unwrap().is_empty());
    }
}
