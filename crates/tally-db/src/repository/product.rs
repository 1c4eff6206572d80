//! # Product Repository
//!
//! Database operations for catalog products.
//!
//! ## Key Operations
//! - Merchant-scoped CRUD (active products only)
//! - Soft delete
//! - Stock moves used by sales and cancellations
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two terminals sell the last unit at the same time                     │
//! │                                                                         │
//! │  Terminal A: UPDATE ... SET stock = stock - 1 WHERE ... stock >= 1     │
//! │              → 1 row  ✓ (holds write lock until commit)                │
//! │                                                                         │
//! │  Terminal B: same statement, waits on the write lock                   │
//! │              → A commits, stock is 0                                   │
//! │              → 0 rows ✗ InsufficientStock                              │
//! │                                                                         │
//! │  The check and the write are one statement, so there is no gap        │
//! │  between reading stock and changing it.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{query, query_as};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::UnitOfWork;
use tally_core::{Product, ProductPatch};

const PRODUCT_COLUMNS: &str = "id, merchant_id, name, description, price_cents, stock, \
                               is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub fn new() -> Self {
        ProductRepository
    }

    /// Gets an active product owned by `merchant_id`.
    pub async fn get_active(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
    ) -> DbResult<Option<Product>> {
        debug!(id = %id, merchant_id = %merchant_id, "Getting product");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE id = ?1 AND merchant_id = ?2 AND is_active = 1"
        );
        let product = query_as::<_, Product>(&sql)
            .bind(id)
            .bind(merchant_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(product)
    }

    /// Gets a product by ID regardless of owner or soft-delete state.
    ///
    /// Used to attach the referenced product to historical items.
    pub async fn get_any(&self, tx: &mut UnitOfWork, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(product)
    }

    /// Lists a merchant's active products ordered by name.
    pub async fn list_active(&self, tx: &mut UnitOfWork, merchant_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE merchant_id = ?1 AND is_active = 1 \
             ORDER BY name ASC, id ASC"
        );
        let products = query_as::<_, Product>(&sql)
            .bind(merchant_id)
            .fetch_all(&mut **tx)
            .await?;

        debug!(merchant_id = %merchant_id, count = products.len(), "Listed products");
        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, tx: &mut UnitOfWork, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, merchant_id = %product.merchant_id, "Inserting product");

        query(
            r#"
            INSERT INTO products (
                id, merchant_id, name, description, price_cents, stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.merchant_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Applies the supplied fields of `patch`. Returns rows affected (0 or 1).
    pub async fn update(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(id = %id, merchant_id = %merchant_id, "Updating product");

        let result = query(
            r#"
            UPDATE products
            SET
                name = COALESCE(?3, name),
                description = COALESCE(?4, description),
                price_cents = COALESCE(?5, price_cents),
                stock = COALESCE(?6, stock),
                updated_at = ?7
            WHERE id = ?1 AND merchant_id = ?2 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(&patch.description)
        .bind(patch.price_cents)
        .bind(patch.stock)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-deletes a product by setting is_active = 0.
    ///
    /// Historical items still reference the row.
    pub async fn soft_delete(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(id = %id, merchant_id = %merchant_id, "Soft-deleting product");

        let result = query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?3
            WHERE id = ?1 AND merchant_id = ?2 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Takes `quantity` units from stock if, and only if, enough are on hand.
    ///
    /// Returns `false` when no row matched: the product is missing, owned by
    /// someone else, soft-deleted, or short on stock. The caller tells these
    /// apart with [`get_active`](Self::get_active).
    pub async fn decrement_stock(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = quantity, "Decrementing stock");

        let result = query(
            r#"
            UPDATE products
            SET stock = stock - ?3, updated_at = ?4
            WHERE id = ?1
              AND merchant_id = ?2
              AND is_active = 1
              AND stock >= ?3
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Puts `quantity` units back. Applies to soft-deleted products too.
    pub async fn restore_stock(
        &self,
        tx: &mut UnitOfWork,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(id = %id, quantity = quantity, "Restoring stock");

        let result = query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(now)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::sample_product;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_scoped_by_merchant() {
        let db = setup().await;
        let repo = db.products();
        let product = sample_product("m-1", "Cola", 1000, 10);

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &product).await.unwrap();

        let found = repo.get_active(&mut tx, "m-1", &product.id).await.unwrap();
        assert_eq!(found.map(|p| p.stock), Some(10));

        let other = repo.get_active(&mut tx, "m-2", &product.id).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_decrement_stock_is_conditional() {
        let db = setup().await;
        let repo = db.products();
        let product = sample_product("m-1", "Cola", 1000, 3);
        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &product).await.unwrap();

        assert!(repo.decrement_stock(&mut tx, "m-1", &product.id, 2, now).await.unwrap());
        assert!(!repo.decrement_stock(&mut tx, "m-1", &product.id, 2, now).await.unwrap());
        assert!(!repo.decrement_stock(&mut tx, "m-2", &product.id, 1, now).await.unwrap());

        let stock = repo.get_active(&mut tx, "m-1", &product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_hidden_but_restorable() {
        let db = setup().await;
        let repo = db.products();
        let product = sample_product("m-1", "Cola", 1000, 3);
        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &product).await.unwrap();
        assert_eq!(repo.soft_delete(&mut tx, "m-1", &product.id, now).await.unwrap(), 1);
        assert_eq!(repo.soft_delete(&mut tx, "m-1", &product.id, now).await.unwrap(), 0);

        assert!(repo.get_active(&mut tx, "m-1", &product.id).await.unwrap().is_none());
        assert!(repo.list_active(&mut tx, "m-1").await.unwrap().is_empty());
        assert!(!repo.decrement_stock(&mut tx, "m-1", &product.id, 1, now).await.unwrap());

        assert_eq!(repo.restore_stock(&mut tx, &product.id, 2, now).await.unwrap(), 1);
        let any = repo.get_any(&mut tx, &product.id).await.unwrap().unwrap();
        assert!(!any.is_active);
        assert_eq!(any.stock, 5);
    }

    #[tokio::test]
    async fn test_update_applies_only_supplied_fields() {
        let db = setup().await;
        let repo = db.products();
        let product = sample_product("m-1", "Cola", 1000, 3);

        let mut tx = db.begin().await.unwrap();
        repo.insert(&mut tx, &product).await.unwrap();

        let patch = ProductPatch {
            price_cents: Some(1200),
            ..Default::default()
        };
        let rows = repo.update(&mut tx, "m-1", &product.id, &patch, Utc::now()).await.unwrap();
        assert_eq!(rows, 1);

        let updated = repo.get_active(&mut tx, "m-1", &product.id).await.unwrap().unwrap();
        assert_eq!(updated.price_cents, 1200);
        assert_eq!(updated.name, "Cola");
        assert_eq!(updated.stock, 3);

        let rows = repo.update(&mut tx, "m-2", &product.id, &patch, Utc::now()).await.unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_list_active_ordered_by_name() {
        let db = setup().await;
        let repo = db.products();

        let mut tx = db.begin().await.unwrap();
        for name in ["Water", "Apple Juice", "Cola"] {
            repo.insert(&mut tx, &sample_product("m-1", name, 100, 1)).await.unwrap();
        }
        repo.insert(&mut tx, &sample_product("m-2", "Beer", 100, 1)).await.unwrap();

        let names: Vec<String> = repo
            .list_active(&mut tx, "m-1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Apple Juice", "Cola", "Water"]);
    }
}
