//! # Resolution History Repository
//!
//! Append-only log of committed ledger actions, one row per action.
//! Rows are written inside the action's transaction and never updated.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use recon_core::ResolutionEvent;

const EVENT_COLUMNS: &str = r#"
    id, tenant_id, line_item_id, action, quantity, short_portion,
    vendor_id, brand_id, action_date, reason, condition, scrap_reason,
    justification, approved_by, received_by, invoice_reference,
    unit_price_cents, movement_id, spawned_line_item_id, actor_id, created_at
"#;

/// Repository for resolution history.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Lists a line item's history, oldest first.
    pub async fn list_for_line_item(
        &self,
        tenant_id: &str,
        line_item_id: &str,
    ) -> DbResult<Vec<ResolutionEvent>> {
        let events = sqlx::query_as::<_, ResolutionEvent>(&format!(
            r#"
            SELECT {}
            FROM resolution_events
            WHERE tenant_id = ?1 AND line_item_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
            EVENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(line_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Counts history rows for a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM resolution_events WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Appends an event on the given connection.
    pub async fn insert_in(conn: &mut SqliteConnection, event: &ResolutionEvent) -> DbResult<()> {
        debug!(
            id = %event.id,
            line_item_id = %event.line_item_id,
            action = %event.action,
            "Recording resolution event"
        );

        sqlx::query(
            r#"
            INSERT INTO resolution_events (
                id, tenant_id, line_item_id, action, quantity, short_portion,
                vendor_id, brand_id, action_date, reason, condition, scrap_reason,
                justification, approved_by, received_by, invoice_reference,
                unit_price_cents, movement_id, spawned_line_item_id, actor_id, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21
            )
            "#,
        )
        .bind(&event.id)
        .bind(&event.tenant_id)
        .bind(&event.line_item_id)
        .bind(event.action)
        .bind(event.quantity)
        .bind(event.short_portion)
        .bind(&event.vendor_id)
        .bind(&event.brand_id)
        .bind(event.action_date)
        .bind(&event.reason)
        .bind(&event.condition)
        .bind(event.scrap_reason)
        .bind(&event.justification)
        .bind(&event.approved_by)
        .bind(&event.received_by)
        .bind(&event.invoice_reference)
        .bind(event.unit_price_cents)
        .bind(&event.movement_id)
        .bind(&event.spawned_line_item_id)
        .bind(&event.actor_id)
        .bind(event.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
