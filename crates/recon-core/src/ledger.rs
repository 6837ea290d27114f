//! # Ledger Transfers
//!
//! Pure planning of every ledger operation. A plan is computed from one
//! snapshot of a [`LineItemRecord`] and describes exactly what must be
//! written; recon-db commits a plan inside one transaction.
//!
//! ## The Four-Bucket Partition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  rejected_quantity (fixed at receipt)                   │
//! │                                                                         │
//! │  ┌──────────────┐  send   ┌──────────────┐  receive  ┌──────────────┐  │
//! │  │ net_rejected │ ──────► │sent_to_vendor│ ────────► │received_back │  │
//! │  │  (derived)   │         └──────────────┘           └──────────────┘  │
//! │  │              │  scrap  ┌──────────────┐                             │
//! │  │              │ ──────► │   scrapped   │                             │
//! │  └──────────────┘         └──────────────┘                             │
//! │                                                                         │
//! │  Every arrow moves `qty` from one bucket to the next. Nothing is       │
//! │  created or destroyed, so the four buckets always sum to the total.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  short_quantity (fixed)  =  available_short  +  short_received_back     │
//! │                                 │    receive back     ▲                 │
//! │                                 └─────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Side Effects per Operation
//! | Operation            | Counters                         | Stock movement          |
//! |----------------------|----------------------------------|-------------------------|
//! | send to vendor       | sent_to_vendor += q              | outgoing q              |
//! | receive from vendor  | sent_to_vendor -= q, back += q   | incoming q - short      |
//! | scrap                | scrapped += q                    | none                    |
//! | receive back (short) | short_received_back += q         | incoming q              |

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::pricing::{PricePolicy, PriceSource, ResolvedPrice};
use crate::types::{
    LedgerContext, LineItemRecord, MovementDirection, NewLineItem, NewStockMovement,
    ResolutionAction, ResolutionEvent, ScrapReason,
};
use crate::validation::{
    require_date, require_some_text, require_text, validate_short_portion,
    validate_transfer_quantity,
};

// =============================================================================
// Commands
// =============================================================================

/// Send rejected units back to the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendToVendor {
    pub record_id: String,
    pub quantity: i64,
    pub vendor_id: String,
    pub brand_id: String,
    pub date: Option<NaiveDate>,
    pub reason: String,
    pub unit_price: Option<Money>,
}

/// Record units the vendor returned, part of which may be short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveFromVendor {
    pub record_id: String,
    pub quantity: i64,
    pub vendor_id: String,
    pub brand_id: String,
    pub date: Option<NaiveDate>,
    pub condition: String,
    pub short_portion: Option<i64>,
    pub unit_price: Option<Money>,
}

/// Write rejected units off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrap {
    pub record_id: String,
    pub quantity: i64,
    pub date: Option<NaiveDate>,
    pub scrap_reason: String,
    pub approved_by: Option<String>,
    /// Required when the reason is `other`.
    pub justification: Option<String>,
}

/// Record receipt of units that were short on the original shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBackShort {
    pub record_id: String,
    pub quantity: i64,
    pub vendor_id: String,
    pub brand_id: String,
    pub date: Option<NaiveDate>,
    pub invoice_reference: String,
    pub received_by: String,
    pub unit_price: Option<Money>,
}

// =============================================================================
// Transfer Plan
// =============================================================================

/// Everything one ledger operation writes, computed before any write.
///
/// ## Commit Contract
/// ```text
/// BEGIN
///   UPDATE line_items SET <counters of `updated`>
///     WHERE id = ? AND version = `expected_version`
///   INSERT stock movement        (if `movement`)
///   INSERT spawned line item     (if `spawned`)
///   INSERT resolution event      (`event`, movement_id filled in)
/// COMMIT  ← all or nothing
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub action: ResolutionAction,
    /// Record with counters applied, version bumped and invariants checked.
    pub updated: LineItemRecord,
    /// Version the snapshot was read at.
    pub expected_version: i64,
    pub movement: Option<NewStockMovement>,
    /// Short obligation opened by a partially short vendor return.
    pub spawned: Option<LineItemRecord>,
    pub event: ResolutionEvent,
    pub price: Option<ResolvedPrice>,
}

impl Transfer {
    /// Checks that this plan is a legal step from `stored`, the row as
    /// currently persisted.
    ///
    /// ```text
    /// stored.version == expected_version, updated.version == +1
    /// identity, rejected_quantity, short_quantity   unchanged
    /// event, movement and spawned rows              belong to `stored`
    /// received_back, scrapped, short_received_back  never decrease
    /// updated satisfies R and S
    /// ```
    pub fn check_against(&self, stored: &LineItemRecord) -> LedgerResult<()> {
        if stored.version != self.expected_version {
            return Err(LedgerError::ConcurrentModification {
                record_id: stored.id.clone(),
            });
        }

        let after = &self.updated;
        if after.version != stored.version + 1 {
            return Err(LedgerError::invalid_input(
                "version",
                format!("expected {}, got {}", stored.version + 1, after.version),
            ));
        }

        for (field, same) in [
            ("id", after.id == stored.id),
            ("tenant_id", after.tenant_id == stored.tenant_id),
            ("sku_id", after.sku_id == stored.sku_id),
            ("rejected_quantity", after.rejected_quantity == stored.rejected_quantity),
            ("short_quantity", after.short_quantity == stored.short_quantity),
            (
                "event",
                self.event.action == self.action
                    && self.event.tenant_id == stored.tenant_id
                    && self.event.line_item_id == stored.id,
            ),
            (
                "movement",
                self.movement.as_ref().map_or(true, |m| m.line_item_id == stored.id),
            ),
            (
                "spawned",
                self.spawned.as_ref().map_or(true, |s| {
                    s.tenant_id == stored.tenant_id
                        && s.source_line_item_id.as_deref() == Some(stored.id.as_str())
                }),
            ),
        ] {
            if !same {
                return Err(LedgerError::invalid_input(field, "does not match the stored line item"));
            }
        }

        for (field, before, now) in [
            ("received_back", stored.received_back, after.received_back),
            ("scrapped", stored.scrapped, after.scrapped),
            ("short_received_back", stored.short_received_back, after.short_received_back),
        ] {
            if now < before {
                return Err(LedgerError::invalid_input(
                    field,
                    format!("cannot decrease from {} to {}", before, now),
                ));
            }
        }

        after.check_invariants()
    }
}

/// Inputs shared by every planner besides the command itself.
#[derive(Debug, Clone, Copy)]
pub struct PlanEnv<'a> {
    pub ctx: &'a LedgerContext,
    pub policy: &'a PricePolicy,
    /// Price from the SKU catalog, if the lookup found one.
    pub catalog_price: Option<Money>,
    pub now: DateTime<Utc>,
}

fn bump(record: &LineItemRecord, now: DateTime<Utc>) -> LineItemRecord {
    let mut updated = record.clone();
    updated.version = record.version + 1;
    updated.updated_at = now;
    updated
}

/// An explicit price becomes the record's last known price.
fn remember_explicit_price(updated: &mut LineItemRecord, price: &ResolvedPrice) {
    if price.source == PriceSource::Explicit {
        updated.unit_price_cents = price.price.cents();
    }
}

/// Price worth storing on a record; the placeholder stays unknown (0).
fn known_price_cents(price: &ResolvedPrice) -> i64 {
    match price.source {
        PriceSource::Placeholder => 0,
        _ => price.price.cents(),
    }
}

fn event_base(
    env: &PlanEnv<'_>,
    record: &LineItemRecord,
    action: ResolutionAction,
    quantity: i64,
    action_date: NaiveDate,
) -> ResolutionEvent {
    ResolutionEvent {
        id: Uuid::new_v4().to_string(),
        tenant_id: record.tenant_id.clone(),
        line_item_id: record.id.clone(),
        action,
        quantity,
        short_portion: 0,
        vendor_id: None,
        brand_id: None,
        action_date,
        reason: None,
        condition: None,
        scrap_reason: None,
        justification: None,
        approved_by: None,
        received_by: None,
        invoice_reference: None,
        unit_price_cents: None,
        movement_id: None,
        spawned_line_item_id: None,
        actor_id: env.ctx.actor_id.clone(),
        created_at: env.now,
    }
}

// =============================================================================
// Rejection Ledger
// =============================================================================

/// Plans moving `quantity` from net rejected into `sent_to_vendor`.
///
/// ## User Workflow
/// ```text
/// Rejected report row (net rejected: 4)
///      │  "Send to vendor" qty 3, vendor, brand, date, reason
///      ▼
/// plan_send_to_vendor ← THIS FUNCTION
///      │
///      ├── missing field?       → MissingField
///      ├── qty ∉ (0, net]?       → InvalidQuantity
///      ▼
/// sent_to_vendor += 3, outgoing movement of 3 units to the vendor
/// ```
pub fn plan_send_to_vendor(
    record: &LineItemRecord,
    cmd: &SendToVendor,
    env: &PlanEnv<'_>,
) -> LedgerResult<Transfer> {
    let vendor_id = require_text("vendor_id", &cmd.vendor_id)?;
    let brand_id = require_text("brand_id", &cmd.brand_id)?;
    let date = require_date("date", cmd.date)?;
    let reason = require_text("reason", &cmd.reason)?;

    validate_transfer_quantity("quantity", cmd.quantity, record.net_rejected())?;

    let mut updated = bump(record, env.now);
    updated.sent_to_vendor += cmd.quantity;
    updated.check_invariants()?;

    let price = env
        .policy
        .resolve(cmd.unit_price, record.unit_price(), env.catalog_price);
    remember_explicit_price(&mut updated, &price);

    let movement = NewStockMovement {
        direction: MovementDirection::Outgoing,
        sku_id: record.sku_id.clone(),
        quantity: cmd.quantity,
        short_quantity: 0,
        unit_price_cents: price.price.cents(),
        counterparty_id: vendor_id.to_string(),
        movement_date: date,
        reference: Some(record.original_invoice_number.clone()),
        remarks: format!("Rejected units sent to vendor: {}", reason),
        line_item_id: record.id.clone(),
    };

    let mut event = event_base(env, record, ResolutionAction::SendToVendor, cmd.quantity, date);
    event.vendor_id = Some(vendor_id.to_string());
    event.brand_id = Some(brand_id.to_string());
    event.reason = Some(reason.to_string());
    event.unit_price_cents = Some(price.price.cents());

    Ok(Transfer {
        action: ResolutionAction::SendToVendor,
        updated,
        expected_version: record.version,
        movement: Some(movement),
        spawned: None,
        event,
        price: Some(price),
    })
}

/// Plans moving `quantity` from `sent_to_vendor` into `received_back`.
///
/// The incoming movement carries `quantity - short_portion` usable units.
/// A non-zero short portion opens a new short obligation, linked back to
/// this record, that [`plan_receive_back_short`] later resolves. When every
/// returned unit is short there is nothing to add to stock and no movement
/// is planned.
pub fn plan_receive_from_vendor(
    record: &LineItemRecord,
    cmd: &ReceiveFromVendor,
    env: &PlanEnv<'_>,
) -> LedgerResult<Transfer> {
    let vendor_id = require_text("vendor_id", &cmd.vendor_id)?;
    let brand_id = require_text("brand_id", &cmd.brand_id)?;
    let date = require_date("date", cmd.date)?;
    let condition = require_text("condition", &cmd.condition)?;

    validate_transfer_quantity("quantity", cmd.quantity, record.sent_to_vendor)?;
    let short_portion = cmd.short_portion.unwrap_or(0);
    validate_short_portion(short_portion, cmd.quantity)?;

    let mut updated = bump(record, env.now);
    updated.sent_to_vendor -= cmd.quantity;
    updated.received_back += cmd.quantity;
    updated.check_invariants()?;

    let price = env
        .policy
        .resolve(cmd.unit_price, record.unit_price(), env.catalog_price);
    remember_explicit_price(&mut updated, &price);
    let usable = cmd.quantity - short_portion;

    let movement = (usable > 0).then(|| NewStockMovement {
        direction: MovementDirection::Incoming,
        sku_id: record.sku_id.clone(),
        quantity: usable,
        short_quantity: short_portion,
        unit_price_cents: price.price.cents(),
        counterparty_id: vendor_id.to_string(),
        movement_date: date,
        reference: Some(record.original_invoice_number.clone()),
        remarks: format!("Returned by vendor ({})", condition),
        line_item_id: record.id.clone(),
    });

    let spawned = if short_portion > 0 {
        let obligation = NewLineItem {
            shipment_id: record.shipment_id.clone(),
            sku_id: record.sku_id.clone(),
            vendor_id: vendor_id.to_string(),
            brand_id: brand_id.to_string(),
            original_invoice_number: record.original_invoice_number.clone(),
            report_number: record.report_number.clone(),
            received_date: date,
            received_quantity: usable,
            rejected_quantity: 0,
            short_quantity: short_portion,
            unit_price_cents: known_price_cents(&price),
            source_line_item_id: Some(record.id.clone()),
        };
        Some(obligation.into_record(Uuid::new_v4().to_string(), &record.tenant_id, env.now)?)
    } else {
        None
    };

    let mut event = event_base(
        env,
        record,
        ResolutionAction::ReceiveFromVendor,
        cmd.quantity,
        date,
    );
    event.short_portion = short_portion;
    event.vendor_id = Some(vendor_id.to_string());
    event.brand_id = Some(brand_id.to_string());
    event.condition = Some(condition.to_string());
    event.unit_price_cents = Some(price.price.cents());
    event.spawned_line_item_id = spawned.as_ref().map(|r| r.id.clone());

    Ok(Transfer {
        action: ResolutionAction::ReceiveFromVendor,
        updated,
        expected_version: record.version,
        movement,
        spawned,
        event,
        price: Some(price),
    })
}

/// Plans moving `quantity` from net rejected into `scrapped`.
///
/// Scrapped units never re-enter stock, so no movement is planned.
pub fn plan_scrap(record: &LineItemRecord, cmd: &Scrap, env: &PlanEnv<'_>) -> LedgerResult<Transfer> {
    let date = require_date("date", cmd.date)?;
    let reason: ScrapReason = cmd.scrap_reason.parse()?;
    let approved_by = require_some_text("approved_by", cmd.approved_by.as_deref())?;
    let justification = if reason.requires_justification() {
        Some(require_some_text("justification", cmd.justification.as_deref())?.to_string())
    } else {
        cmd.justification
            .as_deref()
            .map(str::trim)
            .filter(|j| !j.is_empty())
            .map(str::to_string)
    };

    validate_transfer_quantity("quantity", cmd.quantity, record.net_rejected())?;

    let mut updated = bump(record, env.now);
    updated.scrapped += cmd.quantity;
    updated.check_invariants()?;

    let mut event = event_base(env, record, ResolutionAction::Scrap, cmd.quantity, date);
    event.scrap_reason = Some(reason);
    event.justification = justification;
    event.approved_by = Some(approved_by.to_string());

    Ok(Transfer {
        action: ResolutionAction::Scrap,
        updated,
        expected_version: record.version,
        movement: None,
        spawned: None,
        event,
        price: None,
    })
}

// =============================================================================
// Short Ledger
// =============================================================================

/// Plans receipt of `quantity` previously short units.
pub fn plan_receive_back_short(
    record: &LineItemRecord,
    cmd: &ReceiveBackShort,
    env: &PlanEnv<'_>,
) -> LedgerResult<Transfer> {
    let vendor_id = require_text("vendor_id", &cmd.vendor_id)?;
    let brand_id = require_text("brand_id", &cmd.brand_id)?;
    let date = require_date("date", cmd.date)?;
    let invoice_reference = require_text("invoice_reference", &cmd.invoice_reference)?;
    let received_by = require_text("received_by", &cmd.received_by)?;

    validate_transfer_quantity("quantity", cmd.quantity, record.available_short())?;

    let mut updated = bump(record, env.now);
    updated.short_received_back += cmd.quantity;
    updated.check_invariants()?;

    let price = env
        .policy
        .resolve(cmd.unit_price, record.unit_price(), env.catalog_price);
    remember_explicit_price(&mut updated, &price);

    let movement = NewStockMovement {
        direction: MovementDirection::Incoming,
        sku_id: record.sku_id.clone(),
        quantity: cmd.quantity,
        short_quantity: 0,
        unit_price_cents: price.price.cents(),
        counterparty_id: vendor_id.to_string(),
        movement_date: date,
        reference: Some(invoice_reference.to_string()),
        remarks: format!("Short units received back by {}", received_by),
        line_item_id: record.id.clone(),
    };

    let mut event = event_base(
        env,
        record,
        ResolutionAction::ReceiveBackShort,
        cmd.quantity,
        date,
    );
    event.vendor_id = Some(vendor_id.to_string());
    event.brand_id = Some(brand_id.to_string());
    event.invoice_reference = Some(invoice_reference.to_string());
    event.received_by = Some(received_by.to_string());
    event.unit_price_cents = Some(price.price.cents());

    Ok(Transfer {
        action: ResolutionAction::ReceiveBackShort,
        updated,
        expected_version: record.version,
        movement: Some(movement),
        spawned: None,
        event,
        price: Some(price),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
