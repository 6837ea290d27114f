//! # Reconciliation Ledger Service
//!
//! Runs every ledger operation as one SQLite transaction.
//!
//! ## Operation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  send_to_vendor / receive_from_vendor / scrap / receive_back_short      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    1. read LineItemRecord (snapshot, version v)                        │
//! │    2. PriceLookup::unit_price(sku)                                     │
//! │    3. recon_core::ledger::plan_*  ── precondition failed? ──► ROLLBACK │
//! │    4. UPDATE line_items ... WHERE version = v                          │
//! │         └── 0 rows ──────────────► ConcurrentModification, ROLLBACK    │
//! │    5. StockMovementLog::append   (when the plan has a movement)        │
//! │         └── error ───────────────► StockLogFailure, ROLLBACK           │
//! │    6. INSERT spawned short obligation (when the plan has one)          │
//! │    7. INSERT resolution_events                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A dropped `sqlx::Transaction` rolls back, so every early return above
//! leaves the database exactly as it was.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use recon_core::ledger::{
    plan_receive_back_short, plan_receive_from_vendor, plan_scrap, plan_send_to_vendor, PlanEnv,
    ReceiveBackShort, ReceiveFromVendor, Scrap, SendToVendor, Transfer,
};
use recon_core::report::{rejected_item_reports, short_item_reports};
use recon_core::validation::require_text;
use recon_core::{
    LedgerContext, LedgerError, LedgerResult, LineItemRecord, NewLineItem, PricePolicy,
    RejectedItemReport, ReportFilter, ResolutionEvent, ShortItemReport,
};

use crate::error::DbError;
use crate::repository::history::HistoryRepository;
use crate::repository::line_item::{LineItemRepository, ReportKind};
use crate::repository::sku::PriceLookup;
use crate::repository::stock_movement::StockMovementLog;

// =============================================================================
// Outcome
// =============================================================================

/// What a committed ledger operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// The record as committed (new version).
    pub record: LineItemRecord,
    /// Stock movement appended, if the operation had a physical effect.
    pub movement_id: Option<String>,
    /// Short obligation opened by a partially short vendor return.
    pub spawned: Option<LineItemRecord>,
    /// History row written for the operation.
    pub event_id: String,
}

// =============================================================================
// Service
// =============================================================================

/// Transactional front of the rejection and short ledgers.
///
/// Generic over the stock log and price source so tests and other hosts can
/// swap either seam; [`Database::ledger`](crate::Database::ledger) wires the
/// SQLite implementations.
#[derive(Debug, Clone)]
pub struct ReconciliationLedger<L, P> {
    pool: SqlitePool,
    stock_log: L,
    prices: P,
    policy: PricePolicy,
}

impl<L, P> ReconciliationLedger<L, P>
where
    L: StockMovementLog,
    P: PriceLookup,
{
    /// Creates a ledger over `pool`.
    pub fn new(pool: SqlitePool, stock_log: L, prices: P, policy: PricePolicy) -> Self {
        ReconciliationLedger {
            pool,
            stock_log,
            prices,
            policy,
        }
    }

    /// Returns the unit-price policy in use.
    pub fn policy(&self) -> &PricePolicy {
        &self.policy
    }

    // =========================================================================
    // Receipts
    // =========================================================================

    /// Records a received line with its rejected and short quantities.
    ///
    /// This is how records enter the ledger; the receiving workflow calls it
    /// once per (shipment, SKU).
    #[instrument(
        skip(self, ctx, receipt),
        fields(tenant_id = %ctx.tenant_id, sku_id = %receipt.sku_id),
        err
    )]
    pub async fn record_receipt(
        &self,
        ctx: &LedgerContext,
        receipt: NewLineItem,
    ) -> LedgerResult<LineItemRecord> {
        ctx.validate()?;
        let record = receipt.into_record(Uuid::new_v4().to_string(), &ctx.tenant_id, Utc::now())?;

        LineItemRepository::new(self.pool.clone())
            .insert(&record)
            .await
            .map_err(|e| match e {
                DbError::ForeignKeyViolation { .. } => {
                    LedgerError::invalid_input(
                        "sku_id",
                        format!("{} is not in this tenant's catalog", record.sku_id),
                    )
                }
                other => other.into_ledger(&record.id),
            })?;

        info!(
            id = %record.id,
            rejected = record.rejected_quantity,
            short = record.short_quantity,
            "Receipt recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Rejection Ledger
    // =========================================================================

    /// Sends rejected units back to the vendor.
    #[instrument(
        skip(self, ctx, cmd),
        fields(tenant_id = %ctx.tenant_id, record_id = %cmd.record_id, quantity = cmd.quantity),
        err
    )]
    pub async fn send_to_vendor(
        &self,
        ctx: &LedgerContext,
        cmd: &SendToVendor,
    ) -> LedgerResult<LedgerOutcome> {
        self.execute(ctx, &cmd.record_id, |record, env| {
            plan_send_to_vendor(record, cmd, env)
        })
        .await
    }

    /// Records units the vendor returned.
    #[instrument(
        skip(self, ctx, cmd),
        fields(
            tenant_id = %ctx.tenant_id,
            record_id = %cmd.record_id,
            quantity = cmd.quantity,
            short_portion = cmd.short_portion.unwrap_or(0)
        ),
        err
    )]
    pub async fn receive_from_vendor(
        &self,
        ctx: &LedgerContext,
        cmd: &ReceiveFromVendor,
    ) -> LedgerResult<LedgerOutcome> {
        self.execute(ctx, &cmd.record_id, |record, env| {
            plan_receive_from_vendor(record, cmd, env)
        })
        .await
    }

    /// Writes rejected units off.
    #[instrument(
        skip(self, ctx, cmd),
        fields(tenant_id = %ctx.tenant_id, record_id = %cmd.record_id, quantity = cmd.quantity),
        err
    )]
    pub async fn scrap(&self, ctx: &LedgerContext, cmd: &Scrap) -> LedgerResult<LedgerOutcome> {
        self.execute(ctx, &cmd.record_id, |record, env| plan_scrap(record, cmd, env))
            .await
    }

    // =========================================================================
    // Short Ledger
    // =========================================================================

    /// Records receipt of previously short units.
    #[instrument(
        skip(self, ctx, cmd),
        fields(tenant_id = %ctx.tenant_id, record_id = %cmd.record_id, quantity = cmd.quantity),
        err
    )]
    pub async fn receive_back_short(
        &self,
        ctx: &LedgerContext,
        cmd: &ReceiveBackShort,
    ) -> LedgerResult<LedgerOutcome> {
        self.execute(ctx, &cmd.record_id, |record, env| {
            plan_receive_back_short(record, cmd, env)
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets one record.
    pub async fn get_record(&self, ctx: &LedgerContext, record_id: &str) -> LedgerResult<LineItemRecord> {
        ctx.validate()?;
        let record_id = require_text("record_id", record_id)?;

        LineItemRepository::new(self.pool.clone())
            .get_by_id(&ctx.tenant_id, record_id)
            .await
            .map_err(|e| e.into_ledger(record_id))?
            .ok_or_else(|| LedgerError::RecordNotFound(record_id.to_string()))
    }

    /// Lists a record's committed actions, oldest first.
    pub async fn history(&self, ctx: &LedgerContext, record_id: &str) -> LedgerResult<Vec<ResolutionEvent>> {
        let record = self.get_record(ctx, record_id).await?;

        HistoryRepository::new(self.pool.clone())
            .list_for_line_item(&ctx.tenant_id, &record.id)
            .await
            .map_err(|e| e.into_ledger(&record.id))
    }

    /// Rejected-items report.
    #[instrument(skip(self, ctx, filter), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_rejected_item_reports(
        &self,
        ctx: &LedgerContext,
        filter: &ReportFilter,
    ) -> LedgerResult<Vec<RejectedItemReport>> {
        ctx.validate()?;
        let filter = filter.normalized()?;

        let sources = LineItemRepository::new(self.pool.clone())
            .list_report_sources(&ctx.tenant_id, ReportKind::Rejected, filter.date_from, filter.date_to)
            .await?;

        rejected_item_reports(&sources, &filter)
    }

    /// Short-items report.
    #[instrument(skip(self, ctx, filter), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_short_item_reports(
        &self,
        ctx: &LedgerContext,
        filter: &ReportFilter,
    ) -> LedgerResult<Vec<ShortItemReport>> {
        ctx.validate()?;
        let filter = filter.normalized()?;

        let sources = LineItemRepository::new(self.pool.clone())
            .list_report_sources(&ctx.tenant_id, ReportKind::Short, filter.date_from, filter.date_to)
            .await?;

        short_item_reports(&sources, &filter)
    }

    // =========================================================================
    // Transaction Plumbing
    // =========================================================================

    /// Commits a transfer planned elsewhere.
    ///
    /// The stored row is re-read on the transaction and the plan must be a
    /// legal step from it ([`Transfer::check_against`]): a stale version
    /// fails with `ConcurrentModification`, a plan that rewrites receipt
    /// quantities or moves a counter backwards fails with `InvalidInput`.
    #[instrument(
        skip(self, ctx, transfer),
        fields(tenant_id = %ctx.tenant_id, record_id = %transfer.updated.id),
        err
    )]
    pub async fn commit(&self, ctx: &LedgerContext, transfer: Transfer) -> LedgerResult<LedgerOutcome> {
        ctx.validate()?;
        let record_id = transfer.updated.id.clone();
        let to_ledger = |e: DbError| e.into_ledger(&record_id);

        let mut tx = self.pool.begin().await.map_err(|e| to_ledger(e.into()))?;

        let stored = LineItemRepository::get_in(&mut *tx, &ctx.tenant_id, &record_id)
            .await
            .map_err(to_ledger)?
            .ok_or_else(|| LedgerError::RecordNotFound(record_id.clone()))?;

        let outcome = self.apply(&mut *tx, &stored, transfer).await?;

        tx.commit().await.map_err(|e| to_ledger(e.into()))?;

        info!(
            record_id = %record_id,
            version = outcome.record.version,
            movement_id = ?outcome.movement_id,
            "Planned transfer committed"
        );
        Ok(outcome)
    }

    /// Read, plan, write and commit inside one transaction.
    async fn execute<F>(&self, ctx: &LedgerContext, record_id: &str, plan: F) -> LedgerResult<LedgerOutcome>
    where
        F: FnOnce(&LineItemRecord, &PlanEnv<'_>) -> LedgerResult<Transfer>,
    {
        ctx.validate()?;
        let record_id = require_text("record_id", record_id)?;
        let to_ledger = |e: DbError| e.into_ledger(record_id);

        let mut tx = self.pool.begin().await.map_err(|e| to_ledger(e.into()))?;

        let record = LineItemRepository::get_in(&mut *tx, &ctx.tenant_id, record_id)
            .await
            .map_err(to_ledger)?
            .ok_or_else(|| LedgerError::RecordNotFound(record_id.to_string()))?;

        let catalog_price = self
            .prices
            .unit_price(&mut *tx, &ctx.tenant_id, &record.sku_id)
            .await
            .map_err(to_ledger)?;

        let env = PlanEnv {
            ctx,
            policy: &self.policy,
            catalog_price,
            now: Utc::now(),
        };

        let transfer = plan(&record, &env).map_err(|e| {
            warn!(record_id = %record_id, error = %e, "Ledger precondition failed");
            e
        })?;

        let outcome = self.apply(&mut *tx, &record, transfer).await?;

        tx.commit().await.map_err(|e| to_ledger(e.into()))?;

        info!(
            record_id = %record_id,
            version = outcome.record.version,
            movement_id = ?outcome.movement_id,
            "Ledger operation committed"
        );
        Ok(outcome)
    }

    /// Writes a transfer on an open transaction's connection. `stored` is
    /// the row as read on the same transaction.
    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        stored: &LineItemRecord,
        transfer: Transfer,
    ) -> LedgerResult<LedgerOutcome> {
        let record_id = transfer.updated.id.clone();
        let tenant_id = transfer.updated.tenant_id.clone();

        transfer.check_against(stored).map_err(|e| {
            warn!(record_id = %record_id, error = %e, "Transfer rejected against stored row");
            e
        })?;

        let written =
            LineItemRepository::update_counters_in(conn, &transfer.updated, transfer.expected_version)
                .await
                .map_err(|e| e.into_ledger(&record_id))?;
        if !written {
            warn!(
                record_id = %record_id,
                expected_version = transfer.expected_version,
                "Stale line item version"
            );
            return Err(LedgerError::ConcurrentModification { record_id });
        }

        let movement_id = match &transfer.movement {
            Some(movement) => Some(
                self.stock_log
                    .append(conn, &tenant_id, movement)
                    .await
                    .map_err(|e| {
                        warn!(record_id = %record_id, error = %e, "Stock movement append failed");
                        e.into_ledger(&record_id)
                    })?,
            ),
            None => None,
        };

        if let Some(spawned) = &transfer.spawned {
            LineItemRepository::insert_in(conn, spawned)
                .await
                .map_err(|e| e.into_ledger(&record_id))?;
        }

        let mut event = transfer.event;
        event.movement_id = movement_id.clone();
        HistoryRepository::insert_in(conn, &event)
            .await
            .map_err(|e| e.into_ledger(&record_id))?;

        Ok(LedgerOutcome {
            record: transfer.updated,
            movement_id,
            spawned: transfer.spawned,
            event_id: event.id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
