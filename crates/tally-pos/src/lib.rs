//! # tally-pos: Transaction and Inventory Services
//!
//! The operations a merchant-facing HTTP layer calls into. Each operation
//! runs in its own unit of work and returns [`ApiResult`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          tally-pos                                      │
//! │                                                                         │
//! │   Pos::connect(&PosConfig)                                             │
//! │        │                                                                │
//! │        ├── catalog()  ─► CatalogService  get/list/create/update/delete │
//! │        ├── sales()    ─► SaleService     create_transaction            │
//! │        │                                 cancel_transaction            │
//! │        ├── ledger()   ─► LedgerService   get_transactions              │
//! │        │                                 get_transaction               │
//! │        │                                 update_transaction            │
//! │        └── reports()  ─► ReportService   get_today_sales               │
//! │                                                                         │
//! │   every service shares one Database (pool) and begins its own          │
//! │   unit of work per call                                                 │
//! │                                                                         │
//! │        ┌──────────────────────┐  ┌──────────────────────────────────┐  │
//! │        │   tally-core         │  │   tally-db                       │  │
//! │        │   (rules, money)     │  │   (SQLite, repositories)         │  │
//! │        └──────────────────────┘  └──────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_pos::{init_tracing, Pos, PosConfig};
//! use tally_core::{NewTransaction, SaleLine};
//!
//! let config = PosConfig::from_env()?;
//! init_tracing(&config);
//!
//! let pos = Pos::connect(&config).await?;
//! let sale = pos
//!     .sales()
//!     .create_transaction("merchant-1", NewTransaction {
//!         items: vec![SaleLine::new(product_id, 2)],
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod sale;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use catalog::CatalogService;
pub use config::{ConfigError, PosConfig, DEFAULT_LOG_FILTER};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use ledger::LedgerService;
pub use report::ReportService;
pub use sale::SaleService;

use tally_db::{Database, DbResult};

/// All services over one shared database.
#[derive(Debug, Clone)]
pub struct Pos {
    db: Database,
    catalog: CatalogService,
    sales: SaleService,
    ledger: LedgerService,
    reports: ReportService,
}

impl Pos {
    /// Opens the database described by `config`, migrating it if needed.
    pub async fn connect(config: &PosConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");
        let db = Database::new(config.db_config()).await?;
        Ok(Pos::new(db, config))
    }

    /// Builds the services over an already opened database.
    pub fn new(db: Database, config: &PosConfig) -> Self {
        Pos {
            catalog: CatalogService::new(db.clone()),
            sales: SaleService::new(db.clone()),
            ledger: LedgerService::new(db.clone(), config),
            reports: ReportService::new(db.clone()),
            db,
        }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn sales(&self) -> &SaleService {
        &self.sales
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `config.log_filter`. Returns `false` when a global
/// subscriber was already set.
pub fn init_tracing(config: &PosConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // An earlier subscriber (host application, test harness) stays in place
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_keeps_first_subscriber() {
        let config = PosConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
