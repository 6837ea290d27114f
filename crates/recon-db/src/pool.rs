//! # Database Handle
//!
//! Opens the SQLite pool the ledger runs on and applies migrations.
//!
//! Every ledger operation holds one pooled connection for the length of its
//! transaction. SQLite serializes writers; a writer that cannot get the lock
//! within `busy_timeout` fails, and the ledger reports that as
//! `ConcurrentModification`. WAL mode lets report listings read while an
//! operation is writing.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use recon_core::PricePolicy;

use crate::error::{DbError, DbResult};
use crate::ledger::ReconciliationLedger;
use crate::migrations;
use crate::repository::history::HistoryRepository;
use crate::repository::line_item::LineItemRepository;
use crate::repository::sku::{SkuRepository, SqliteSkuPrices};
use crate::repository::stock_movement::{SqliteStockLog, StockMovementRepository};

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings, usually derived from `ReconConfig::db_config`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for tests.
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// How long an operation waits for a pooled connection.
    pub connect_timeout: Duration,
    /// How long a writer waits on SQLite's lock before the operation fails
    /// with `ConcurrentModification`.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Private in-memory database. One connection, since each in-memory
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle with repository and ledger accessors.
///
/// ```rust,ignore
/// let db = Database::new(config.db_config()).await?;
/// let ledger = db.ledger(config.price_policy()?);
/// let outcome = ledger.send_to_vendor(&ctx, &cmd).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite; line items must reference catalog SKUs.
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let applied = migrations::run_migrations(&pool).await?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            migrations = applied,
            "Ledger database ready"
        );

        Ok(Database { pool })
    }

    /// Raw pool, for callers that need their own connection.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn line_items(&self) -> LineItemRepository {
        LineItemRepository::new(self.pool.clone())
    }

    pub fn skus(&self) -> SkuRepository {
        SkuRepository::new(self.pool.clone())
    }

    pub fn stock_movements(&self) -> StockMovementRepository {
        StockMovementRepository::new(self.pool.clone())
    }

    pub fn history(&self) -> HistoryRepository {
        HistoryRepository::new(self.pool.clone())
    }

    /// Ledger service writing to the built-in stock log and reading catalog
    /// prices from `skus`.
    pub fn ledger(&self, policy: PricePolicy) -> ReconciliationLedger<SqliteStockLog, SqliteSkuPrices> {
        ReconciliationLedger::new(self.pool.clone(), SqliteStockLog, SqliteSkuPrices, policy)
    }

    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name <> '_sqlx_migrations' AND name NOT LIKE 'sqlite%' \
             ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(
            tables,
            vec!["line_items", "resolution_events", "skus", "stock_movements"]
        );

        let triggers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(triggers, 1);

        // Re-running is a no-op.
        assert_eq!(migrations::run_migrations(db.pool()).await.unwrap(), 2);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }
}
