//! # Domain Types
//!
//! Core domain types of the reconciliation ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │   LineItemRecord     │  │  StockMovement   │  │ ResolutionEvent  │  │
//! │  │  ──────────────────  │  │  ──────────────  │  │  ──────────────  │  │
//! │  │  rejected_quantity   │  │  direction       │  │  action          │  │
//! │  │  sent_to_vendor      │  │  quantity        │  │  quantity        │  │
//! │  │  received_back       │  │  short_quantity  │  │  approved_by     │  │
//! │  │  scrapped            │  │  unit_price      │  │  movement_id     │  │
//! │  │  short_quantity      │  │  counterparty    │  │  ...             │  │
//! │  │  short_received_back │  └──────────────────┘  └──────────────────┘  │
//! │  │  version             │                                               │
//! │  └──────────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored vs Derived
//! Only counters are stored. `net_rejected` and `available_short` are
//! methods, recomputed on every call, and never written anywhere.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::validation::{require_non_negative, require_text};

// =============================================================================
// Request Context
// =============================================================================

/// Explicit request-scoped context passed into every ledger operation.
///
/// Tenant and actor are resolved by the caller's auth layer; the ledger only
/// checks that they are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerContext {
    /// Company the records belong to.
    pub tenant_id: String,
    /// Team member performing the action (recorded in history).
    pub actor_id: String,
}

impl LedgerContext {
    /// Creates a context.
    pub fn new(tenant_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        LedgerContext {
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
        }
    }

    /// Checks that tenant and actor are present.
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("tenant_id", &self.tenant_id)?;
        require_text("actor_id", &self.actor_id)?;
        Ok(())
    }
}

// =============================================================================
// SKU Catalog
// =============================================================================

/// A catalog entry: the code and name shown on reports, plus the last
/// known unit price used when an action omits one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sku {
    pub id: String,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    /// 0 when unknown.
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sku {
    /// Returns the catalog price.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Line Item Record
// =============================================================================

/// One received (shipment, SKU) line with its rejection and short counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItemRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this record belongs to.
    pub tenant_id: String,

    /// Shipment (goods receipt) this line was received under.
    pub shipment_id: String,

    pub sku_id: String,
    pub vendor_id: String,
    pub brand_id: String,
    pub original_invoice_number: String,
    pub report_number: String,

    /// Date the originating shipment was received.
    #[ts(as = "String")]
    pub received_date: NaiveDate,

    /// Units accepted into usable stock at receipt.
    pub received_quantity: i64,

    /// Units rejected at receipt. Fixed at creation.
    pub rejected_quantity: i64,

    /// Units currently out with the vendor.
    pub sent_to_vendor: i64,

    /// Units the vendor has returned.
    pub received_back: i64,

    /// Units written off.
    pub scrapped: i64,

    /// Units short at receipt. Fixed at creation.
    pub short_quantity: i64,

    /// Short units received since.
    pub short_received_back: i64,

    /// Last known unit price in minor units (0 when unknown).
    pub unit_price_cents: i64,

    /// Set when this record is the short obligation of a vendor return.
    pub source_line_item_id: Option<String>,

    /// Optimistic-concurrency version, +1 per committed write.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl LineItemRecord {
    /// Rejected units not yet sent, returned or scrapped.
    ///
    /// ```text
    /// net_rejected = rejected_quantity - sent_to_vendor - received_back - scrapped
    /// ```
    #[inline]
    pub fn net_rejected(&self) -> i64 {
        self.rejected_quantity - self.sent_to_vendor - self.received_back - self.scrapped
    }

    /// Short units still owed by the vendor.
    #[inline]
    pub fn available_short(&self) -> i64 {
        self.short_quantity - self.short_received_back
    }

    /// Returns the last known unit price.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Verifies both conservation laws.
    ///
    /// ## Invariants
    /// ```text
    /// R: rejected == sent_to_vendor + received_back + scrapped + net_rejected
    ///    with every term >= 0
    /// S: 0 <= short_received_back <= short_quantity
    /// ```
    pub fn check_invariants(&self) -> LedgerResult<()> {
        for (field, value) in [
            ("rejected_quantity", self.rejected_quantity),
            ("sent_to_vendor", self.sent_to_vendor),
            ("received_back", self.received_back),
            ("scrapped", self.scrapped),
            ("short_quantity", self.short_quantity),
            ("short_received_back", self.short_received_back),
        ] {
            if value < 0 {
                return Err(LedgerError::invalid_quantity(field, value, 0));
            }
        }

        if self.net_rejected() < 0 {
            return Err(LedgerError::invalid_quantity(
                "net_rejected",
                self.sent_to_vendor + self.received_back + self.scrapped,
                self.rejected_quantity,
            ));
        }

        if self.available_short() < 0 {
            return Err(LedgerError::invalid_quantity(
                "short_received_back",
                self.short_received_back,
                self.short_quantity,
            ));
        }

        Ok(())
    }
}

/// A line as captured by the receiving workflow, before it gets an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub shipment_id: String,
    pub sku_id: String,
    pub vendor_id: String,
    pub brand_id: String,
    pub original_invoice_number: String,
    pub report_number: String,
    pub received_date: NaiveDate,
    pub received_quantity: i64,
    pub rejected_quantity: i64,
    pub short_quantity: i64,
    pub unit_price_cents: i64,
    pub source_line_item_id: Option<String>,
}

impl NewLineItem {
    /// Validates the receipt and builds a record with all counters at zero.
    pub fn into_record(
        self,
        id: String,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<LineItemRecord> {
        require_text("tenant_id", tenant_id)?;
        require_text("shipment_id", &self.shipment_id)?;
        require_text("sku_id", &self.sku_id)?;
        require_text("vendor_id", &self.vendor_id)?;
        require_text("brand_id", &self.brand_id)?;
        require_non_negative("received_quantity", self.received_quantity)?;
        require_non_negative("rejected_quantity", self.rejected_quantity)?;
        require_non_negative("short_quantity", self.short_quantity)?;
        require_non_negative("unit_price", self.unit_price_cents)?;

        Ok(LineItemRecord {
            id,
            tenant_id: tenant_id.to_string(),
            shipment_id: self.shipment_id,
            sku_id: self.sku_id,
            vendor_id: self.vendor_id,
            brand_id: self.brand_id,
            original_invoice_number: self.original_invoice_number,
            report_number: self.report_number,
            received_date: self.received_date,
            received_quantity: self.received_quantity,
            rejected_quantity: self.rejected_quantity,
            sent_to_vendor: 0,
            received_back: 0,
            scrapped: 0,
            short_quantity: self.short_quantity,
            short_received_back: 0,
            unit_price_cents: self.unit_price_cents,
            source_line_item_id: self.source_line_item_id,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Direction of a physical stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    /// Units added to usable stock.
    Incoming,
    /// Units removed from usable stock.
    Outgoing,
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementDirection::Incoming => write!(f, "incoming"),
            MovementDirection::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// A stock movement the ledger asks the stock log to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockMovement {
    pub direction: MovementDirection,
    pub sku_id: String,
    /// Usable units moved. Must be positive.
    pub quantity: i64,
    /// Units recorded as short on an incoming return (not added to stock).
    pub short_quantity: i64,
    /// Resolved unit price in minor units. Must be positive.
    pub unit_price_cents: i64,
    /// Vendor the units went to or came from.
    pub counterparty_id: String,
    pub movement_date: NaiveDate,
    /// Invoice reference tagged on short receipts.
    pub reference: Option<String>,
    pub remarks: String,
    /// Line item that caused the movement.
    pub line_item_id: String,
}

impl NewStockMovement {
    /// Returns the resolved unit price.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A movement as persisted by the stock log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub direction: MovementDirection,
    pub sku_id: String,
    pub quantity: i64,
    pub short_quantity: i64,
    pub unit_price_cents: i64,
    pub counterparty_id: String,
    #[ts(as = "String")]
    pub movement_date: NaiveDate,
    pub reference: Option<String>,
    pub remarks: String,
    pub line_item_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Scrap Reason
// =============================================================================

/// Why rejected units were written off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScrapReason {
    Damaged,
    Expired,
    Defective,
    /// Requires a free-text justification.
    Other,
}

impl ScrapReason {
    /// Returns true when a justification must accompany the reason.
    pub fn requires_justification(&self) -> bool {
        matches!(self, ScrapReason::Other)
    }
}

impl fmt::Display for ScrapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapReason::Damaged => write!(f, "damaged"),
            ScrapReason::Expired => write!(f, "expired"),
            ScrapReason::Defective => write!(f, "defective"),
            ScrapReason::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ScrapReason {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(LedgerError::missing("scrap_reason")),
            "damaged" => Ok(ScrapReason::Damaged),
            "expired" => Ok(ScrapReason::Expired),
            "defective" => Ok(ScrapReason::Defective),
            "other" => Ok(ScrapReason::Other),
            other => Err(LedgerError::invalid_input(
                "scrap_reason",
                format!(
                    "unknown reason '{}', expected one of: damaged, expired, defective, other",
                    other
                ),
            )),
        }
    }
}

// =============================================================================
// Resolution History
// =============================================================================

/// Which ledger operation produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    SendToVendor,
    ReceiveFromVendor,
    Scrap,
    ReceiveBackShort,
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionAction::SendToVendor => write!(f, "send_to_vendor"),
            ResolutionAction::ReceiveFromVendor => write!(f, "receive_from_vendor"),
            ResolutionAction::Scrap => write!(f, "scrap"),
            ResolutionAction::ReceiveBackShort => write!(f, "receive_back_short"),
        }
    }
}

/// One committed ledger action, with the metadata the action carried.
///
/// Appended in the same transaction as the counter update; never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ResolutionEvent {
    pub id: String,
    pub tenant_id: String,
    pub line_item_id: String,
    pub action: ResolutionAction,
    pub quantity: i64,
    pub short_portion: i64,
    pub vendor_id: Option<String>,
    pub brand_id: Option<String>,
    #[ts(as = "String")]
    pub action_date: NaiveDate,
    pub reason: Option<String>,
    pub condition: Option<String>,
    pub scrap_reason: Option<ScrapReason>,
    pub justification: Option<String>,
    pub approved_by: Option<String>,
    pub received_by: Option<String>,
    pub invoice_reference: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub movement_id: Option<String>,
    /// Short obligation opened by a partially short vendor return.
    pub spawned_line_item_id: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
