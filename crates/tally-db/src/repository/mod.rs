//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Units of Work                       │
//! │                                                                         │
//! │  Service (tally-pos)                                                   │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  db.products().decrement_stock(&mut tx, ...)                   │
//! │       │  db.transactions().insert(&mut tx, ...)                        │
//! │       │  Database::commit(tx).await?;                                  │
//! │       ▼                                                                 │
//! │  ProductRepository / TransactionRepository / ReportRepository         │
//! │  (stateless; every method runs inside the caller's unit of work)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never begin or commit. Whoever opened the unit of work
//! decides whether its statements land together or not at all.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and stock moves
//! - [`TransactionRepository`](transaction::TransactionRepository) - Ledger headers and items
//! - [`ReportRepository`](report::ReportRepository) - Sales aggregation

use uuid::Uuid;

pub mod product;
pub mod report;
pub mod transaction;

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tally_core::Product;

    use super::generate_id;

    pub(crate) fn sample_product(merchant_id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_id(),
            merchant_id: merchant_id.to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
