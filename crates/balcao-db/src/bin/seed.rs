//! # Seed Data Generator
//!
//! Populates the database with demo products and clients for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default SQLite file
//! cargo run -p balcao-db --bin seed
//!
//! # Specify a database URL (SQLite file or PostgreSQL)
//! cargo run -p balcao-db --bin seed -- --db sqlite://data/loja.db?mode=rwc
//! cargo run -p balcao-db --bin seed -- --db postgres://localhost/loja
//! ```
//!
//! The generated data is a small home-fragrance shop: a handful of
//! products across three categories, plus pessoa and empresa clients, so
//! every tipo-conditional rule has a row exercising it.

use std::env;

use tracing_subscriber::EnvFilter;

use balcao_core::{Client, FaixaIdade, Product, TipoCliente};
use balcao_db::{Database, DbConfig};

const PRODUCTS: &[(&str, &str, &str, f64, f64, i64)] = &[
    ("ABR01", "Aromatizador Lavanda 250ml", "Aromatizadores", 8.50, 24.90, 30),
    ("ABR02", "Aromatizador Baunilha 250ml", "Aromatizadores", 8.50, 24.90, 25),
    ("ABR03", "Aromatizador Capim-Limão 500ml", "Aromatizadores", 14.00, 39.90, 12),
    ("VEL01", "Vela Aromática Lavanda", "Velas", 6.00, 19.90, 40),
    ("VEL02", "Vela Aromática Canela", "Velas", 6.00, 19.90, 35),
    ("VEL03", "Vela 3 Pavios Vanilla", "Velas", 15.00, 44.90, 8),
    ("DIF01", "Difusor de Varetas Bamboo", "Difusores", 12.00, 34.90, 18),
    ("DIF02", "Difusor Elétrico Bivolt", "Difusores", 28.00, 79.90, 5),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_url = String::from("sqlite://loja_dev.db?mode=rwc");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_url = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Balcão Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <URL>   Database URL (default: sqlite://loja_dev.db?mode=rwc)");
                println!("  -h, --help       Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Balcão Seed Data Generator");
    println!("=============================");
    println!("Database: {db_url}");
    println!();

    let db = Database::connect(DbConfig::new(&db_url)).await?;
    println!("✓ Connected ({})", db.backend());
    println!("✓ Schema ensured");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} products");
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Seeding products...");
    for (codigo, produto, categoria, custo, valor, estoque) in PRODUCTS {
        let product = Product::new(codigo, produto, categoria, *custo, *valor, *estoque)?;
        db.products().save(&product).await?;
        println!("  {} {}", product.codigo, product.produto);
    }

    println!();
    println!("Seeding clients...");
    for client in demo_clients() {
        db.clients().save(&client).await?;
        println!("  {} {}", client.id_cliente, client.display_name());
    }

    println!();
    println!(
        "✓ Seed complete: {} products, {} clients",
        db.products().count().await?,
        db.clients().count().await?,
    );

    Ok(())
}

fn demo_clients() -> Vec<Client> {
    vec![
        Client {
            id_cliente: "CLI001".to_string(),
            cliente: "Ana Souza".to_string(),
            vendedor: Some("Paula".to_string()),
            tipo: TipoCliente::Pessoa,
            idade: Some(FaixaIdade::De25a34),
            genero: Some("F".to_string()),
            profissao: Some("arquiteta".to_string()),
            cpf_cnpj: Some("123.456.789-00".to_string()),
            telefone: Some("11 98888-0001".to_string()),
            endereco: None,
        },
        Client {
            id_cliente: "CLI002".to_string(),
            cliente: "João Pereira".to_string(),
            vendedor: None,
            tipo: TipoCliente::Pessoa,
            idade: Some(FaixaIdade::De45a54),
            genero: Some("M".to_string()),
            profissao: None,
            cpf_cnpj: None,
            telefone: None,
            endereco: None,
        },
        Client {
            id_cliente: "CLI003".to_string(),
            cliente: "Pousada Flor do Campo Ltda".to_string(),
            vendedor: Some("Paula".to_string()),
            tipo: TipoCliente::Empresa,
            idade: None,
            genero: None,
            profissao: None,
            cpf_cnpj: Some("12.345.678/0001-95".to_string()),
            telefone: Some("11 3333-0000".to_string()),
            endereco: Some("Estrada do Campo, km 12".to_string()),
        },
    ]
}
