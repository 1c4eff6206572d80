//! # Catalog Service
//!
//! Merchant-scoped product CRUD.
//!
//! Reads and writes only ever see active products owned by the calling
//! merchant. "Does not exist" and "belongs to someone else" are reported
//! the same way.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::ApiResult;
use tally_core::validation::{validate_id, validate_new_product, validate_product_patch};
use tally_core::{CoreError, NewProduct, Product, ProductPatch};
use tally_db::{generate_id, Database, ProductRepository};

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    repository: ProductRepository,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService {
            repository: db.products(),
            db,
        }
    }

    /// Gets one active product.
    pub async fn get_product(&self, merchant_id: &str, id: &str) -> ApiResult<Product> {
        let mut tx = self.db.begin().await?;

        let product = self
            .repository
            .get_active(&mut tx, merchant_id, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        Database::commit(tx).await?;
        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list_products(&self, merchant_id: &str) -> ApiResult<Vec<Product>> {
        let mut tx = self.db.begin().await?;
        let products = self.repository.list_active(&mut tx, merchant_id).await?;
        Database::commit(tx).await?;
        Ok(products)
    }

    /// Creates a product after validating name, price and stock.
    pub async fn create_product(&self, merchant_id: &str, input: NewProduct) -> ApiResult<Product> {
        validate_id("merchant_id", merchant_id)?;
        validate_new_product(&input)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            merchant_id: merchant_id.to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        self.repository.insert(&mut tx, &product).await?;
        Database::commit(tx).await?;

        info!(
            product_id = %product.id,
            merchant_id = %merchant_id,
            price = %product.price(),
            stock = product.stock,
            "Product created"
        );
        Ok(product)
    }

    /// Applies a partial update. Only supplied fields change.
    pub async fn update_product(
        &self,
        merchant_id: &str,
        id: &str,
        patch: ProductPatch,
    ) -> ApiResult<()> {
        validate_product_patch(&patch)?;

        let mut tx = self.db.begin().await?;
        let rows = self
            .repository
            .update(&mut tx, merchant_id, id, &patch, Utc::now())
            .await?;

        if rows == 0 {
            return Err(not_found_or_unauthorized(id).into());
        }

        Database::commit(tx).await?;
        debug!(product_id = %id, merchant_id = %merchant_id, "Product updated");
        Ok(())
    }

    /// Soft-deletes a product. Historical sale items keep referencing it.
    pub async fn delete_product(&self, merchant_id: &str, id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;
        let rows = self
            .repository
            .soft_delete(&mut tx, merchant_id, id, Utc::now())
            .await?;

        if rows == 0 {
            return Err(not_found_or_unauthorized(id).into());
        }

        Database::commit(tx).await?;
        info!(product_id = %id, merchant_id = %merchant_id, "Product deleted");
        Ok(())
    }
}

fn not_found_or_unauthorized(id: &str) -> CoreError {
    CoreError::NotFoundOrUnauthorized {
        entity: "Product".to_string(),
        id: id.to_string(),
    }
}
