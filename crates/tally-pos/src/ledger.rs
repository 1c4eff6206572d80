//! # Ledger Service
//!
//! Reads over recorded transactions, and the one mutation allowed after a
//! sale: editing notes and customer name.

use chrono::Utc;
use tracing::debug;

use crate::config::PosConfig;
use crate::error::ApiResult;
use tally_core::validation::resolve_page;
use tally_core::{CoreError, Page, Transaction, TransactionPatch};
use tally_db::{Database, DbResult, ProductRepository, TransactionRepository, UnitOfWork};

#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    transactions: TransactionRepository,
    products: ProductRepository,
    page_size: i64,
    max_page_size: i64,
}

impl LedgerService {
    pub fn new(db: Database, config: &PosConfig) -> Self {
        LedgerService {
            transactions: db.transactions(),
            products: db.products(),
            db,
            page_size: config.page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// Lists transactions newest first, items included.
    ///
    /// `limit` defaults to the configured page size and is clamped to the
    /// configured maximum. A non-positive limit or negative offset is
    /// rejected.
    pub async fn get_transactions(
        &self,
        merchant_id: &str,
        limit: Option<i64>,
        offset: i64,
    ) -> ApiResult<Page<Transaction>> {
        let (limit, offset) = resolve_page(limit, offset, self.page_size, self.max_page_size)?;

        let mut tx = self.db.begin().await?;

        let total = self.transactions.count(&mut tx, merchant_id).await?;
        let mut data = self
            .transactions
            .list(&mut tx, merchant_id, limit, offset)
            .await?;
        for transaction in &mut data {
            transaction.items = self.transactions.items(&mut tx, &transaction.id).await?;
        }

        Database::commit(tx).await?;

        debug!(merchant_id = %merchant_id, total, returned = data.len(), "Listed transactions");
        Ok(Page {
            data,
            total,
            limit,
            offset,
        })
    }

    /// Gets one transaction with items, each carrying its current product.
    pub async fn get_transaction(&self, merchant_id: &str, id: &str) -> ApiResult<Transaction> {
        let mut tx = self.db.begin().await?;

        let transaction = load_transaction(&self.transactions, &mut tx, merchant_id, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        let transaction = self.attach_products(&mut tx, transaction).await?;

        Database::commit(tx).await?;
        Ok(transaction)
    }

    /// Updates notes and/or customer name.
    ///
    /// Financial fields are not part of [`TransactionPatch`] and cannot be
    /// reached. Allowed on cancelled transactions too.
    pub async fn update_transaction(
        &self,
        merchant_id: &str,
        id: &str,
        patch: TransactionPatch,
    ) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        let rows = self
            .transactions
            .update_details(&mut tx, merchant_id, id, &patch, Utc::now())
            .await?;
        if rows == 0 {
            return Err(CoreError::TransactionNotFound(id.to_string()).into());
        }

        Database::commit(tx).await?;
        debug!(transaction_id = %id, merchant_id = %merchant_id, "Transaction details updated");
        Ok(())
    }

    async fn attach_products(
        &self,
        tx: &mut UnitOfWork,
        mut transaction: Transaction,
    ) -> DbResult<Transaction> {
        for item in &mut transaction.items {
            item.product = self.products.get_any(tx, &item.product_id).await?;
        }
        Ok(transaction)
    }
}

/// Reads a transaction header and its items inside an open unit of work.
pub(crate) async fn load_transaction(
    transactions: &TransactionRepository,
    tx: &mut UnitOfWork,
    merchant_id: &str,
    id: &str,
) -> DbResult<Option<Transaction>> {
    let Some(mut transaction) = transactions.get(tx, merchant_id, id).await? else {
        return Ok(None);
    };
    transaction.items = transactions.items(tx, id).await?;
    Ok(Some(transaction))
}
