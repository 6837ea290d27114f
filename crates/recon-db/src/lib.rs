//! # recon-db: Storage and Transactions for the Reconciliation Ledger
//!
//! SQLite persistence for line items, the stock movement log and the
//! resolution history, plus the transactional ledger service on top.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Data Flow                            │
//! │                                                                         │
//! │  Caller (UI command, API handler, seed binary)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     recon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ReconciliationLedger (ledger.rs)                              │   │
//! │  │     one transaction per operation, optimistic version check     │   │
//! │  │       │                          │                              │   │
//! │  │       ▼                          ▼                              │   │
//! │  │   recon-core planners      Repositories                         │   │
//! │  │   (pure, no I/O)           line_item / sku / stock_movement /   │   │
//! │  │                            history                              │   │
//! │  │                                  │                              │   │
//! │  │   Database (pool.rs) ◄───────────┘    Migrations (embedded)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - The transactional ledger service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recon_db::{Database, ReconConfig};
//! use recon_core::LedgerContext;
//!
//! let config = ReconConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let ledger = db.ledger(config.price_policy()?);
//!
//! let ctx = LedgerContext::new(config.ledger.tenant_id.clone(), "clerk-7");
//! let outcome = ledger.send_to_vendor(&ctx, &cmd).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, ReconConfig};
pub use error::{DbError, DbResult, StockLogError};
pub use ledger::{LedgerOutcome, ReconciliationLedger};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::history::HistoryRepository;
pub use repository::line_item::{LineItemRepository, ReportKind};
pub use repository::sku::{PriceLookup, SkuRepository, SqliteSkuPrices};
pub use repository::stock_movement::{SqliteStockLog, StockMovementLog, StockMovementRepository};
