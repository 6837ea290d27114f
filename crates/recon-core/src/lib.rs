//! # recon-core: Pure Ledger Logic for Rejected and Short Stock
//!
//! This crate holds the bookkeeping rules that track what happens to units
//! rejected at goods receipt and units invoiced but never delivered. It has
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Receiving / Reports UI (any caller)              │   │
//! │  │   Rejected report ──► Send / Receive / Scrap ──► History        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            recon-db: ReconciliationLedger service               │   │
//! │  │   one sqlx transaction per operation, optimistic versioning     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plan, then commit                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ recon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  ledger  │ │ pricing  │ │  report  │          │   │
//! │  │   │LineItem  │ │ Transfer │ │PricePolicy││ Rejected │          │   │
//! │  │   │Movement  │ │ planners │ │          │ │  Short   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineItemRecord, StockMovement, ResolutionEvent)
//! - [`ledger`] - Commands and transfer planning for every ledger operation
//! - [`pricing`] - Unit-price fallback policy
//! - [`report`] - Rejected/short report projections and filters
//! - [`money`] - Integer money
//! - [`validation`] - Shared precondition checks
//! - [`error`] - Ledger error type
//!
//! ## Design Principles
//!
//! 1. **Counters are the only truth**: derived balances are recomputed, never stored
//! 2. **Plan before write**: every operation is planned from one snapshot and
//!    validated completely before anything touches storage
//! 3. **Conservation**: a plan that would break a bucket law is an error
//! 4. **Explicit context**: tenant and actor arrive as parameters
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use recon_core::ledger::{plan_send_to_vendor, PlanEnv, SendToVendor};
//! use recon_core::{LedgerContext, NewLineItem, PricePolicy};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
//! let record = NewLineItem {
//!     shipment_id: "shp-1".into(),
//!     sku_id: "sku-1".into(),
//!     vendor_id: "ven-1".into(),
//!     brand_id: "brd-1".into(),
//!     original_invoice_number: "INV-1".into(),
//!     report_number: "GRN-1".into(),
//!     received_date: date,
//!     received_quantity: 90,
//!     rejected_quantity: 10,
//!     short_quantity: 0,
//!     unit_price_cents: 500,
//!     source_line_item_id: None,
//! }
//! .into_record("li-1".into(), "t-1", Utc::now())
//! .unwrap();
//!
//! let ctx = LedgerContext::new("t-1", "u-1");
//! let policy = PricePolicy::default();
//! let env = PlanEnv { ctx: &ctx, policy: &policy, catalog_price: None, now: Utc::now() };
//! let cmd = SendToVendor {
//!     record_id: "li-1".into(),
//!     quantity: 6,
//!     vendor_id: "ven-1".into(),
//!     brand_id: "brd-1".into(),
//!     date: Some(date),
//!     reason: "broken seal".into(),
//!     unit_price: None,
//! };
//!
//! let plan = plan_send_to_vendor(&record, &cmd, &env).unwrap();
//! assert_eq!(plan.updated.net_rejected(), 4);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{LedgerError, LedgerResult};
pub use money::Money;
pub use pricing::{PricePolicy, PriceSource, ResolvedPrice};
pub use report::{RejectedItemReport, ReportFilter, ReportStatus, ShortItemReport};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by single-company installs and the seed binary.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";
