//! # Line Item Repository
//!
//! Persistence for [`LineItemRecord`] counters.
//!
//! ## Versioned Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Writer A (version 3)                Writer B (version 3)              │
//! │       │                                   │                             │
//! │       ▼                                   │                             │
//! │  UPDATE ... WHERE id = ? AND version = 3  │                             │
//! │  → 1 row, version becomes 4               │                             │
//! │                                           ▼                             │
//! │                      UPDATE ... WHERE id = ? AND version = 3            │
//! │                      → 0 rows → ConcurrentModification, rollback        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods ending in `_in` run on a caller-supplied connection so the
//! ledger service can put them inside its transaction.

use chrono::NaiveDate;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use recon_core::report::ReportSource;
use recon_core::LineItemRecord;

/// Column list matching [`LineItemRecord`]'s `FromRow` layout.
const LINE_ITEM_COLUMNS: &str = r#"
    li.id, li.tenant_id, li.shipment_id, li.sku_id, li.vendor_id, li.brand_id,
    li.original_invoice_number, li.report_number, li.received_date,
    li.received_quantity, li.rejected_quantity, li.sent_to_vendor,
    li.received_back, li.scrapped, li.short_quantity, li.short_received_back,
    li.unit_price_cents, li.source_line_item_id, li.version,
    li.created_at, li.updated_at
"#;

/// Which report a listing feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Rejected,
    Short,
}

impl ReportKind {
    fn predicate(self) -> &'static str {
        match self {
            ReportKind::Rejected => "li.rejected_quantity > 0",
            ReportKind::Short => "li.short_quantity > 0",
        }
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    #[sqlx(flatten)]
    record: LineItemRecord,
    sku_code: String,
    item_name: String,
}

impl From<ReportRow> for ReportSource {
    fn from(row: ReportRow) -> Self {
        ReportSource {
            record: row.record,
            sku_code: row.sku_code,
            item_name: row.item_name,
        }
    }
}

/// Repository for line item operations.
#[derive(Debug, Clone)]
pub struct LineItemRepository {
    pool: SqlitePool,
}

impl LineItemRepository {
    /// Creates a new LineItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LineItemRepository { pool }
    }

    /// Gets a line item by ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<LineItemRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, tenant_id, id).await
    }

    /// Inserts a line item.
    pub async fn insert(&self, record: &LineItemRecord) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, record).await
    }

    /// Lists line items spawned from `source_id` by short vendor returns.
    pub async fn list_spawned_from(
        &self,
        tenant_id: &str,
        source_id: &str,
    ) -> DbResult<Vec<LineItemRecord>> {
        let records = sqlx::query_as::<_, LineItemRecord>(&format!(
            r#"
            SELECT {}
            FROM line_items li
            WHERE li.tenant_id = ?1 AND li.source_line_item_id = ?2
            ORDER BY li.created_at ASC, li.id ASC
            "#,
            LINE_ITEM_COLUMNS
        ))
        .bind(tenant_id)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Counts a tenant's line items.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Loads report rows joined with SKU display fields.
    ///
    /// Only the cheap filters run in SQL (tenant, kind, date range); the
    /// search and status filters run on the projected rows.
    pub async fn list_report_sources(
        &self,
        tenant_id: &str,
        kind: ReportKind,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> DbResult<Vec<ReportSource>> {
        debug!(tenant_id = %tenant_id, ?kind, "Loading report rows");

        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {},
                COALESCE(s.code, '') AS sku_code,
                COALESCE(s.name, '') AS item_name
            FROM line_items li
            LEFT JOIN skus s ON s.id = li.sku_id AND s.tenant_id = li.tenant_id
            WHERE li.tenant_id = ?1
              AND {}
              AND (?2 IS NULL OR li.received_date >= ?2)
              AND (?3 IS NULL OR li.received_date <= ?3)
            ORDER BY li.received_date DESC, li.id ASC
            "#,
            LINE_ITEM_COLUMNS,
            kind.predicate()
        ))
        .bind(tenant_id)
        .bind(date_from)
        .bind(date_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReportSource::from).collect())
    }

    // =========================================================================
    // Connection-scoped operations (used inside ledger transactions)
    // =========================================================================

    /// Reads a line item on the given connection.
    pub async fn get_in(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<LineItemRecord>> {
        let record = sqlx::query_as::<_, LineItemRecord>(&format!(
            "SELECT {} FROM line_items li WHERE li.id = ?1 AND li.tenant_id = ?2",
            LINE_ITEM_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Inserts a line item on the given connection.
    pub async fn insert_in(conn: &mut SqliteConnection, record: &LineItemRecord) -> DbResult<()> {
        debug!(id = %record.id, sku_id = %record.sku_id, "Inserting line item");

        sqlx::query(
            r#"
            INSERT INTO line_items (
                id, tenant_id, shipment_id, sku_id, vendor_id, brand_id,
                original_invoice_number, report_number, received_date,
                received_quantity, rejected_quantity, sent_to_vendor,
                received_back, scrapped, short_quantity, short_received_back,
                unit_price_cents, source_line_item_id, version,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(&record.shipment_id)
        .bind(&record.sku_id)
        .bind(&record.vendor_id)
        .bind(&record.brand_id)
        .bind(&record.original_invoice_number)
        .bind(&record.report_number)
        .bind(record.received_date)
        .bind(record.received_quantity)
        .bind(record.rejected_quantity)
        .bind(record.sent_to_vendor)
        .bind(record.received_back)
        .bind(record.scrapped)
        .bind(record.short_quantity)
        .bind(record.short_received_back)
        .bind(record.unit_price_cents)
        .bind(&record.source_line_item_id)
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the mutable counters of `record` if the stored version still
    /// equals `expected_version`.
    ///
    /// ## Returns
    /// `false` when the row was changed (or removed) since it was read.
    pub async fn update_counters_in(
        conn: &mut SqliteConnection,
        record: &LineItemRecord,
        expected_version: i64,
    ) -> DbResult<bool> {
        debug!(
            id = %record.id,
            expected_version,
            version = record.version,
            "Updating line item counters"
        );

        let result = sqlx::query(
            r#"
            UPDATE line_items SET
                sent_to_vendor = ?1,
                received_back = ?2,
                scrapped = ?3,
                short_received_back = ?4,
                unit_price_cents = ?5,
                version = ?6,
                updated_at = ?7
            WHERE id = ?8 AND tenant_id = ?9 AND version = ?10
            "#,
        )
        .bind(record.sent_to_vendor)
        .bind(record.received_back)
        .bind(record.scrapped)
        .bind(record.short_received_back)
        .bind(record.unit_price_cents)
        .bind(record.version)
        .bind(record.updated_at)
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
