//! # Sale Service
//!
//! Creates sales against live stock and reverses them.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_transaction(merchant, { items: [A×2, B×1] })                   │
//! │       │                                                                 │
//! │       ├── validate (no unit of work yet)                               │
//! │       ▼                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────┐      │
//! │  │ line 0: decrement A by 2 if stock >= 2 ── 0 rows? ─► abort ──┤      │
//! │  │         read A, snapshot name + price, subtotal             │      │
//! │  │ line 1: decrement B by 1 if stock >= 1 ── 0 rows? ─► abort ──┤      │
//! │  │         read B, snapshot name + price, subtotal             │      │
//! │  │ total = Σ subtotals                                         │      │
//! │  │ insert header, insert items                                 │      │
//! │  COMMIT                                        drop = ROLLBACK ◄┘      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-read transaction with items                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel
//! ```text
//!  BEGIN
//!   status completed → cancelled (compare-and-swap, 0 rows? → explain, abort)
//!   for each item: stock = stock + quantity
//!  COMMIT
//! ```
//!
//! The first statement of both units of work is a write, so SQLite hands
//! out the write lock before anything is read. Concurrent sales of the same
//! product queue on that lock and each sees the stock its predecessor left.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::ApiResult;
use crate::ledger::load_transaction;
use tally_core::validation::{validate_id, validate_new_transaction};
use tally_core::{
    total_of, CoreError, NewTransaction, SaleLine, Transaction, TransactionItem,
    TransactionStatus,
};
use tally_db::{generate_id, Database, DbResult, ProductRepository, TransactionRepository, UnitOfWork};

#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    products: ProductRepository,
    transactions: TransactionRepository,
}

impl SaleService {
    pub fn new(db: Database) -> Self {
        SaleService {
            products: db.products(),
            transactions: db.transactions(),
            db,
        }
    }

    /// Records a sale and takes its quantities out of stock, all or nothing.
    ///
    /// Lines are processed in the order given. The first line that names an
    /// unknown product or asks for more than is on hand aborts the sale and
    /// rolls back every earlier decrement.
    pub async fn create_transaction(
        &self,
        merchant_id: &str,
        input: NewTransaction,
    ) -> ApiResult<Transaction> {
        validate_id("merchant_id", merchant_id)?;
        validate_new_transaction(&input)?;

        let now = Utc::now();
        let transaction_id = generate_id();

        let mut tx = self.db.begin().await?;

        let mut items = Vec::with_capacity(input.items.len());
        for (line_no, line) in input.items.iter().enumerate() {
            let item = self
                .take_line(&mut tx, merchant_id, &transaction_id, line_no as i64, line)
                .await?;
            items.push(item);
        }

        let total = total_of(&items)?;

        let header = Transaction {
            id: transaction_id.clone(),
            merchant_id: merchant_id.to_string(),
            total_amount_cents: total.cents(),
            payment_method: input.payment_method,
            customer_name: input.customer_name,
            notes: input.notes,
            status: TransactionStatus::Completed,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };

        self.transactions.insert(&mut tx, &header).await?;
        for item in &items {
            self.transactions.insert_item(&mut tx, item).await?;
        }

        Database::commit(tx).await?;

        info!(
            transaction_id = %transaction_id,
            merchant_id = %merchant_id,
            total = %total,
            items = items.len(),
            "Sale created"
        );

        let mut tx = self.db.begin().await?;
        let created = load_transaction(&self.transactions, &mut tx, merchant_id, &transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.clone()))?;
        Database::commit(tx).await?;

        Ok(created)
    }

    /// Decrements stock for one line and snapshots the product into an item.
    async fn take_line(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        transaction_id: &str,
        line_no: i64,
        line: &SaleLine,
    ) -> ApiResult<TransactionItem> {
        let now = Utc::now();
        let taken = self
            .products
            .decrement_stock(tx, merchant_id, &line.product_id, line.quantity, now)
            .await?;

        let product = self
            .products
            .get_active(tx, merchant_id, &line.product_id)
            .await?;

        let product = match (taken, product) {
            (true, Some(product)) => product,
            (_, None) => {
                warn!(product_id = %line.product_id, merchant_id = %merchant_id, "Sale rejected: unknown product");
                return Err(CoreError::ProductNotFound(line.product_id.clone()).into());
            }
            (false, Some(product)) => {
                warn!(
                    product_id = %product.id,
                    available = product.stock,
                    requested = line.quantity,
                    "Sale rejected: insufficient stock"
                );
                return Err(product.insufficient_stock(line.quantity).into());
            }
        };

        let item = TransactionItem::snapshot(
            generate_id(),
            transaction_id.to_string(),
            line_no,
            &product,
            line.quantity,
        )?;

        debug!(
            product_id = %item.product_id,
            quantity = item.quantity,
            subtotal = %item.subtotal(),
            "Line taken"
        );
        Ok(item)
    }

    /// Cancels a completed sale and puts its quantities back in stock.
    ///
    /// Exactly one cancel of a given transaction can succeed; every later
    /// attempt fails with `AlreadyCancelled` and changes nothing.
    pub async fn cancel_transaction(&self, merchant_id: &str, id: &str) -> ApiResult<()> {
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let flipped = self
            .transactions
            .mark_cancelled(&mut tx, merchant_id, id, now)
            .await?;

        if !flipped {
            let err = match self.transactions.get(&mut tx, merchant_id, id).await? {
                Some(existing) if existing.is_cancelled() => CoreError::AlreadyCancelled(existing.id),
                _ => CoreError::TransactionNotFound(id.to_string()),
            };
            return Err(err.into());
        }

        let restored = self.restore_items(&mut tx, id).await?;

        Database::commit(tx).await?;

        info!(
            transaction_id = %id,
            merchant_id = %merchant_id,
            items = restored,
            "Sale cancelled"
        );
        Ok(())
    }

    async fn restore_items(&self, tx: &mut UnitOfWork, transaction_id: &str) -> DbResult<usize> {
        let items = self.transactions.items(tx, transaction_id).await?;
        let now = Utc::now();

        for item in &items {
            let rows = self
                .products
                .restore_stock(tx, &item.product_id, item.quantity, now)
                .await?;
            if rows == 0 {
                warn!(product_id = %item.product_id, "Stock restore matched no product");
            }
        }

        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogService;
    use crate::error::ErrorCode;
    use tally_core::{NewProduct, PaymentMethod};
    use tally_db::DbConfig;

    async fn setup(stock: i64) -> (SaleService, CatalogService, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = CatalogService::new(db.clone());
        let product = catalog
            .create_product(
                "m-1",
                NewProduct {
                    name: "Cola".to_string(),
                    description: None,
                    price_cents: 1000,
                    stock,
                },
            )
            .await
            .unwrap();
        (SaleService::new(db), catalog, product.id)
    }

    fn sale(lines: Vec<SaleLine>) -> NewTransaction {
        NewTransaction {
            items: lines,
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sell_three_of_ten() {
        let (sales, catalog, product_id) = setup(10).await;

        let created = sales
            .create_transaction("m-1", sale(vec![SaleLine::new(&product_id, 3)]))
            .await
            .unwrap();

        assert_eq!(created.items.len(), 1);
        assert_eq!(created.items[0].subtotal_cents, 3000);
        assert_eq!(created.total_amount_cents, 3000);
        assert_eq!(created.status, TransactionStatus::Completed);
        assert_eq!(created.payment_method, Some(PaymentMethod::Card));
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let (sales, catalog, product_id) = setup(2).await;

        let err = sales
            .create_transaction("m-1", sale(vec![SaleLine::new(&product_id, 3)]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Insufficient stock for Cola: available 2, requested 3"
        );
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_other_merchants_product_is_not_found() {
        let (sales, catalog, product_id) = setup(5).await;

        let err = sales
            .create_transaction("m-2", sale(vec![SaleLine::new(&product_id, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_empty_and_zero_quantity_rejected() {
        let (sales, _, product_id) = setup(5).await;

        let err = sales.create_transaction("m-1", sale(vec![])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = sales
            .create_transaction("m-1", sale(vec![SaleLine::new(&product_id, 0)]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_cancel_twice() {
        let (sales, catalog, product_id) = setup(20).await;
        let created = sales
            .create_transaction("m-1", sale(vec![SaleLine::new(&product_id, 5)]))
            .await
            .unwrap();
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 15);

        sales.cancel_transaction("m-1", &created.id).await.unwrap();
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 20);

        let err = sales.cancel_transaction("m-1", &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyCancelled);
        assert_eq!(
            err.message,
            format!("Transaction {} is already cancelled", created.id)
        );
        assert_eq!(catalog.get_product("m-1", &product_id).await.unwrap().stock, 20);
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_foreign_transaction() {
        let (sales, _, product_id) = setup(20).await;
        let created = sales
            .create_transaction("m-1", sale(vec![SaleLine::new(&product_id, 1)]))
            .await
            .unwrap();

        let err = sales.cancel_transaction("m-2", &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = sales.cancel_transaction("m-1", "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
