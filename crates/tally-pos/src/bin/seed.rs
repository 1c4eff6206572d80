//! # Seed Data Generator
//!
//! Loads a demo catalog for one merchant and rings up a sample sale.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally.db (or $TALLY_DB_PATH) for merchant "demo"
//! cargo run -p tally-pos --bin seed
//!
//! # Specify database path and merchant
//! cargo run -p tally-pos --bin seed -- --db ./data/tally.db --merchant shop-42
//! ```
//!
//! Runs are skipped when the merchant already has products, so seeding is
//! safe to repeat.

use std::env;
use std::path::PathBuf;

use tally_core::{NewProduct, NewTransaction, PaymentMethod, SaleLine};
use tally_db::migrations::migration_status;
use tally_pos::{init_tracing, Pos, PosConfig};

/// Demo catalog: (name, price in cents, opening stock)
const CATALOG: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "Beverages",
        &[
            ("Coca-Cola 330ml", 150, 48),
            ("Sprite 330ml", 150, 36),
            ("Mineral Water 500ml", 90, 60),
            ("Orange Juice 1L", 349, 12),
            ("Iced Tea 500ml", 199, 24),
            ("Coffee Beans 250g", 899, 8),
        ],
    ),
    (
        "Snacks",
        &[
            ("Potato Chips Classic", 249, 30),
            ("Chocolate Bar", 129, 40),
            ("Salted Pretzels", 199, 20),
            ("Oat Cookies", 299, 15),
        ],
    ),
    (
        "Dairy",
        &[
            ("Whole Milk 1L", 119, 20),
            ("Greek Yogurt", 179, 18),
            ("Cheddar Cheese 200g", 459, 10),
            ("Butter 250g", 329, 14),
        ],
    ),
    (
        "Grocery",
        &[
            ("White Bread", 229, 10),
            ("Pasta Penne 500g", 179, 25),
            ("Basmati Rice 1kg", 399, 16),
            ("Peanut Butter", 449, 9),
            ("Honey 350g", 599, 6),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PosConfig::from_env()?;
    let mut merchant_id = String::from("demo");

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--merchant" | "-m" => {
                if i + 1 < args.len() {
                    merchant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: $TALLY_DB_PATH or ./tally.db)");
                println!("  -m, --merchant <ID>      Merchant to seed (default: demo)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing(&config);

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database_path.display());
    println!("Merchant: {}", merchant_id);
    println!();

    let pos = Pos::connect(&config).await?;
    if !pos.database().health_check().await {
        eprintln!("✗ Database at {} is not answering queries", config.database_path.display());
        return Ok(());
    }
    let (total, applied) = migration_status(pos.database().pool()).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied ({}/{})", applied, total);

    let existing = pos.catalog().list_products(&merchant_id).await?;
    if !existing.is_empty() {
        println!("⚠ Merchant already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Creating products...");

    let mut created = Vec::new();
    for (category, products) in CATALOG {
        for (name, price_cents, stock) in products.iter() {
            let input = NewProduct {
                name: name.to_string(),
                description: Some(category.to_string()),
                price_cents: *price_cents,
                stock: *stock,
            };

            match pos.catalog().create_product(&merchant_id, input).await {
                Ok(product) => created.push(product),
                Err(e) => eprintln!("Failed to create {}: {}", name, e),
            }
        }
        println!("  {}: {} products", category, products.len());
    }

    println!("✓ Created {} products", created.len());

    if created.len() >= 2 {
        println!();
        println!("Recording sample sale...");

        let sale = NewTransaction {
            items: vec![
                SaleLine::new(created[0].id.clone(), 2),
                SaleLine::new(created[1].id.clone(), 1),
            ],
            payment_method: Some(PaymentMethod::Cash),
            customer_name: Some("Walk-in".to_string()),
            notes: Some("Seeded sample".to_string()),
        };

        let transaction = pos.sales().create_transaction(&merchant_id, sale).await?;
        println!("✓ Sale {} total {}", transaction.id, transaction.total_amount());
        println!("{}", serde_json::to_string_pretty(&transaction)?);
    }

    let summary = pos.reports().get_today_sales(&merchant_id).await?;
    println!();
    println!(
        "Today ({}): {} sales, {}",
        summary.date,
        summary.count,
        summary.total_amount()
    );

    println!();
    println!("✓ Seed complete!");

    pos.database().close().await;
    Ok(())
}
