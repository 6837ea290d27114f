//! # Migrations
//!
//! The ledger schema lives in `migrations/sqlite/` and is embedded into the
//! binary by `sqlx::migrate!`.
//!
//! ```text
//! 001_initial_schema.sql        skus, line_items, stock_movements, resolution_events
//! 002_line_item_sku_tenant.sql  line items only reference their tenant's SKUs
//! ```
//!
//! The CHECK constraints on `line_items` mirror
//! `LineItemRecord::check_invariants`; change them together, in a new file.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. Returns how many are recorded as applied.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<usize> {
    MIGRATOR.run(pool).await?;

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    info!(
        embedded = MIGRATOR.migrations.len(),
        applied,
        "Ledger schema up to date"
    );
    Ok(applied as usize)
}
