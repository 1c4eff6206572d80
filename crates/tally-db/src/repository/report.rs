//! # Report Repository
//!
//! Aggregations over the sales ledger.

use chrono::{DateTime, Utc};
use sqlx::query_as;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::UnitOfWork;

/// Repository for read-only sales aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        ReportRepository
    }

    /// Sums completed transactions created in `[start, end)`.
    ///
    /// Returns `(total_amount_cents, count)`. Cancelled transactions are
    /// excluded; an empty window yields `(0, 0)`.
    pub async fn completed_sales_between(
        &self,
        tx: &mut UnitOfWork,
        merchant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<(i64, i64)> {
        debug!(merchant_id = %merchant_id, %start, %end, "Summing completed sales");

        let totals: (i64, i64) = query_as(
            r#"
            SELECT COALESCE(SUM(total_amount_cents), 0), COUNT(*)
            FROM transactions
            WHERE merchant_id = ?1
              AND status = 'completed'
              AND created_at >= ?2
              AND created_at < ?3
            "#,
        )
        .bind(merchant_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut **tx)
        .await?;

        Ok(totals)
    }
}
