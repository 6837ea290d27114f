//! # Stock Movement Log
//!
//! The append-only log of physical stock changes, and the
//! [`StockMovementLog`] seam the ledger writes through.
//!
//! ## Append Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger transaction                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockMovementLog::append(conn, tenant, movement)                      │
//! │       │                                                                 │
//! │       ├── quantity <= 0 or unit price <= 0 → InvalidAmount             │
//! │       ├── write failed                     → Db(..)                    │
//! │       └── OK → movement id                                             │
//! │                                                                         │
//! │  Any error aborts the whole ledger operation: counters, history and    │
//! │  the movement commit together or not at all.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, StockLogError};
use recon_core::{NewStockMovement, StockMovement};

// =============================================================================
// Stock Log Seam
// =============================================================================

/// Destination for the stock movements a ledger operation produces.
///
/// Implementations write on the supplied connection, which is inside the
/// ledger's transaction.
#[async_trait]
pub trait StockMovementLog: Send + Sync {
    /// Appends one movement and returns its ID.
    async fn append(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        movement: &NewStockMovement,
    ) -> Result<String, StockLogError>;
}

/// [`StockMovementLog`] backed by the `stock_movements` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStockLog;

#[async_trait]
impl StockMovementLog for SqliteStockLog {
    async fn append(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        movement: &NewStockMovement,
    ) -> Result<String, StockLogError> {
        if movement.quantity <= 0 || movement.unit_price_cents <= 0 {
            return Err(StockLogError::InvalidAmount {
                quantity: movement.quantity,
                unit_price_cents: movement.unit_price_cents,
            });
        }

        let id = Uuid::new_v4().to_string();

        debug!(
            id = %id,
            direction = %movement.direction,
            sku_id = %movement.sku_id,
            quantity = movement.quantity,
            "Appending stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, direction, sku_id, quantity, short_quantity,
                unit_price_cents, counterparty_id, movement_date, reference,
                remarks, line_item_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(movement.direction)
        .bind(&movement.sku_id)
        .bind(movement.quantity)
        .bind(movement.short_quantity)
        .bind(movement.unit_price_cents)
        .bind(&movement.counterparty_id)
        .bind(movement.movement_date)
        .bind(&movement.reference)
        .bind(&movement.remarks)
        .bind(&movement.line_item_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(id)
    }
}

// =============================================================================
// Read Repository
// =============================================================================

const MOVEMENT_COLUMNS: &str = r#"
    id, tenant_id, direction, sku_id, quantity, short_quantity,
    unit_price_cents, counterparty_id, movement_date, reference,
    remarks, line_item_id, created_at
"#;

/// Read access to the stock log.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    /// Creates a new StockMovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    /// Gets a movement by ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE id = ?1 AND tenant_id = ?2",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Lists movements caused by one line item, oldest first.
    pub async fn list_for_line_item(
        &self,
        tenant_id: &str,
        line_item_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE tenant_id = ?1 AND line_item_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(line_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Counts all movements for a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use recon_core::{Money, MovementDirection, NewLineItem};

    async fn setup() -> (Database, NewStockMovement) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sku = db
            .skus()
            .create("t-1", "SKU-3", "Wall Plug", Money::zero())
            .await
            .unwrap();
        let record = NewLineItem {
            shipment_id: "shp-1".into(),
            sku_id: sku.id.clone(),
            vendor_id: "ven-1".into(),
            brand_id: "brd-1".into(),
            original_invoice_number: "INV-3".into(),
            report_number: "GRN-3".into(),
            received_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            received_quantity: 5,
            rejected_quantity: 5,
            short_quantity: 0,
            unit_price_cents: 0,
            source_line_item_id: None,
        }
        .into_record("li-1".into(), "t-1", Utc::now())
        .unwrap();
        db.line_items().insert(&record).await.unwrap();

        let movement = NewStockMovement {
            direction: MovementDirection::Outgoing,
            sku_id: sku.id,
            quantity: 2,
            short_quantity: 0,
            unit_price_cents: 80,
            counterparty_id: "ven-1".into(),
            movement_date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            reference: Some("INV-3".into()),
            remarks: "sent back".into(),
            line_item_id: "li-1".into(),
        };
        (db, movement)
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let (db, movement) = setup().await;

        let mut conn = db.pool().acquire().await.unwrap();
        let id = SqliteStockLog
            .append(&mut conn, "t-1", &movement)
            .await
            .unwrap();
        drop(conn);

        let repo = db.stock_movements();
        let stored = repo.get_by_id("t-1", &id).await.unwrap().unwrap();
        assert_eq!(stored.direction, MovementDirection::Outgoing);
        assert_eq!(stored.quantity, 2);
        assert_eq!(stored.line_item_id.as_deref(), Some("li-1"));

        assert_eq!(repo.list_for_line_item("t-1", "li-1").await.unwrap().len(), 1);
        assert_eq!(repo.count("t-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_non_positive_amounts() {
        let (db, movement) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut zero_qty = movement.clone();
        zero_qty.quantity = 0;
        assert!(matches!(
            SqliteStockLog.append(&mut conn, "t-1", &zero_qty).await,
            Err(StockLogError::InvalidAmount { .. })
        ));

        let mut zero_price = movement;
        zero_price.unit_price_cents = 0;
        assert!(matches!(
            SqliteStockLog.append(&mut conn, "t-1", &zero_price).await,
            Err(StockLogError::InvalidAmount { .. })
        ));
    }
}
