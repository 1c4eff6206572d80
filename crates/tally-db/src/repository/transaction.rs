//! # Transaction Repository
//!
//! Database operations for the sales ledger: transaction headers and their
//! snapshot line items.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Transaction Lifecycle                           │
//! │                                                                         │
//! │  insert() + insert_item() × N   (same unit of work as the decrements)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────┐   mark_cancelled()   ┌───────────┐                      │
//! │  │ COMPLETED │ ───────────────────► │ CANCELLED │  (terminal)          │
//! │  └───────────┘   status CAS, once   └───────────┘                      │
//! │       │                                   │                             │
//! │       └──── update_details() ─────────────┘  notes / customer only     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{query, query_as, query_scalar};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::UnitOfWork;
use tally_core::{Transaction, TransactionItem, TransactionPatch};

const HEADER_COLUMNS: &str = "id, merchant_id, total_amount_cents, payment_method, \
                              customer_name, notes, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, line_no, product_name, \
                            price_cents, quantity, subtotal_cents";

/// Repository for ledger database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRepository;

impl TransactionRepository {
    pub fn new() -> Self {
        TransactionRepository
    }

    /// Inserts a transaction header. Items are inserted separately.
    pub async fn insert(&self, tx: &mut UnitOfWork, header: &Transaction) -> DbResult<()> {
        debug!(id = %header.id, merchant_id = %header.merchant_id, "Inserting transaction");

        query(
            r#"
            INSERT INTO transactions (
                id, merchant_id, total_amount_cents, payment_method,
                customer_name, notes, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&header.id)
        .bind(&header.merchant_id)
        .bind(header.total_amount_cents)
        .bind(header.payment_method)
        .bind(&header.customer_name)
        .bind(&header.notes)
        .bind(header.status)
        .bind(header.created_at)
        .bind(header.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Inserts one line item.
    pub async fn insert_item(&self, tx: &mut UnitOfWork, item: &TransactionItem) -> DbResult<()> {
        query(
            r#"
            INSERT INTO transaction_items (
                id, transaction_id, product_id, line_no, product_name,
                price_cents, quantity, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transaction_id)
        .bind(&item.product_id)
        .bind(item.line_no)
        .bind(&item.product_name)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(item.subtotal_cents)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Gets a transaction header owned by `merchant_id`, without items.
    pub async fn get(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
    ) -> DbResult<Option<Transaction>> {
        debug!(id = %id, merchant_id = %merchant_id, "Getting transaction");

        let sql = format!(
            "SELECT {HEADER_COLUMNS} FROM transactions WHERE id = ?1 AND merchant_id = ?2"
        );
        let header = query_as::<_, Transaction>(&sql)
            .bind(id)
            .bind(merchant_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(header)
    }

    /// Gets the items of a transaction in sale order.
    pub async fn items(&self, tx: &mut UnitOfWork, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items \
             WHERE transaction_id = ?1 ORDER BY line_no ASC"
        );
        let items = query_as::<_, TransactionItem>(&sql)
            .bind(transaction_id)
            .fetch_all(&mut **tx)
            .await?;

        Ok(items)
    }

    /// Lists a merchant's transaction headers, newest first.
    pub async fn list(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {HEADER_COLUMNS} FROM transactions \
             WHERE merchant_id = ?1 \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let headers = query_as::<_, Transaction>(&sql)
            .bind(merchant_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await?;

        debug!(merchant_id = %merchant_id, count = headers.len(), "Listed transactions");
        Ok(headers)
    }

    /// Counts all of a merchant's transactions, any status.
    pub async fn count(&self, tx: &mut UnitOfWork, merchant_id: &str) -> DbResult<i64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM transactions WHERE merchant_id = ?1")
            .bind(merchant_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(count)
    }

    /// Flips `completed` to `cancelled`.
    ///
    /// Returns `false` when nothing matched: missing, another merchant's, or
    /// already cancelled. Only one of two racing cancels can see `true`.
    pub async fn mark_cancelled(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, merchant_id = %merchant_id, "Cancelling transaction");

        let result = query(
            r#"
            UPDATE transactions
            SET status = 'cancelled', updated_at = ?3
            WHERE id = ?1 AND merchant_id = ?2 AND status = 'completed'
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Updates notes and/or customer name. Absent fields are left as they are.
    pub async fn update_details(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        id: &str,
        patch: &TransactionPatch,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(id = %id, merchant_id = %merchant_id, "Updating transaction details");

        let result = query(
            r#"
            UPDATE transactions
            SET
                notes = COALESCE(?3, notes),
                customer_name = COALESCE(?4, customer_name),
                updated_at = ?5
            WHERE id = ?1 AND merchant_id = ?2
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .bind(&patch.notes)
        .bind(&patch.customer_name)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
