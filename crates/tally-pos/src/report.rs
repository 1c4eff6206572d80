//! # Report Service
//!
//! Daily sales summaries.
//!
//! A "day" is a calendar day in the server's local time zone. The bounds
//! are converted to UTC before querying, so a sale stored at 23:30 UTC can
//! belong to tomorrow's report east of Greenwich.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use tally_core::SalesSummary;
use tally_db::{Database, ReportRepository};

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
    reports: ReportRepository,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService {
            reports: db.reports(),
            db,
        }
    }

    /// Completed sales since local midnight today.
    pub async fn get_today_sales(&self, merchant_id: &str) -> ApiResult<SalesSummary> {
        self.get_sales_for_day(merchant_id, Local::now().date_naive())
            .await
    }

    /// Completed sales for one local calendar day.
    ///
    /// Cancelled transactions are excluded. A day with no sales yields a
    /// zero summary rather than an error.
    pub async fn get_sales_for_day(
        &self,
        merchant_id: &str,
        date: NaiveDate,
    ) -> ApiResult<SalesSummary> {
        let (start, end) = local_day_bounds(date)?;

        let mut tx = self.db.begin().await?;
        let (total_amount_cents, count) = self
            .reports
            .completed_sales_between(&mut tx, merchant_id, start, end)
            .await?;
        Database::commit(tx).await?;

        debug!(merchant_id = %merchant_id, %date, total_amount_cents, count, "Daily sales");
        Ok(SalesSummary {
            total_amount_cents,
            count,
            date,
        })
    }
}

/// UTC instants of local midnight at the start of `date` and of the next day.
pub(crate) fn local_day_bounds(date: NaiveDate) -> ApiResult<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| ApiError::invalid_input("date is out of range"))?;
    Ok((local_midnight(date), local_midnight(next)))
}

/// Longest clock jump searched past midnight. Real-world gaps are one hour
/// or less and start on a quarter hour.
const MAX_GAP_MINUTES: i64 = 180;
const GAP_STEP_MINUTES: usize = 15;

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    first_instant_of_day(date, |naive| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

/// First existing instant of `date` under `resolve`.
///
/// When midnight falls in a DST gap the day starts where the gap ends, which
/// is the first quarter hour after midnight that `resolve` accepts.
fn first_instant_of_day<F>(date: NaiveDate, resolve: F) -> DateTime<Utc>
where
    F: Fn(NaiveDateTime) -> Option<DateTime<Utc>>,
{
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=MAX_GAP_MINUTES)
        .step_by(GAP_STEP_MINUTES)
        .find_map(|minutes| resolve(midnight + Duration::minutes(minutes)))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
