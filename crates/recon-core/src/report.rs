//! # Report Projections
//!
//! Read-only rows for the rejected-items and short-items screens.
//!
//! ## Data Flow
//! ```text
//! ┌────────────────┐    ┌────────────────┐    ┌──────────────────────────┐
//! │  line_items    │    │     skus       │    │   ReportFilter           │
//! │  (counters)    │ ─┬─│ (code, name)   │    │  date range, search,     │
//! └────────────────┘  │ └────────────────┘    │  outstanding_only        │
//!                     ▼                       └────────────┬─────────────┘
//!              ReportSource ──────── filter.matches() ─────┘
//!                     │
//!                     ▼
//!     RejectedItemReport / ShortItemReport   (derived fields recomputed)
//! ```
//!
//! Nothing here is ever written back. Every derived field comes from the
//! counters of the row being projected.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::types::LineItemRecord;
use crate::validation::validate_search;

// =============================================================================
// Filter
// =============================================================================

/// Filters shared by both report listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    /// Inclusive lower bound on the shipment's received date.
    #[ts(as = "Option<String>")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the shipment's received date.
    #[ts(as = "Option<String>")]
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring over invoice, report number, SKU code
    /// and item name.
    pub search: Option<String>,
    /// Only rows with something left to reconcile.
    #[serde(default)]
    pub outstanding_only: bool,
}

impl ReportFilter {
    /// Validates the filter and returns a normalized copy.
    ///
    /// The search string is trimmed and lowercased; a blank search is
    /// dropped.
    pub fn normalized(&self) -> LedgerResult<ReportFilter> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(LedgerError::invalid_input(
                    "date_from",
                    format!("{} is after date_to {}", from, to),
                ));
            }
        }

        Ok(ReportFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            search: validate_search(self.search.as_deref())?.map(|s| s.to_lowercase()),
            outstanding_only: self.outstanding_only,
        })
    }

    /// True when the row passes the date range and search. Expects a
    /// normalized filter.
    pub fn matches(&self, source: &ReportSource) -> bool {
        let date = source.record.received_date;
        if self.date_from.map(|from| date < from).unwrap_or(false) {
            return false;
        }
        if self.date_to.map(|to| date > to).unwrap_or(false) {
            return false;
        }

        match &self.search {
            None => true,
            Some(needle) => [
                source.record.original_invoice_number.as_str(),
                source.record.report_number.as_str(),
                source.sku_code.as_str(),
                source.item_name.as_str(),
            ]
            .iter()
            .any(|haystack| haystack.to_lowercase().contains(needle.as_str())),
        }
    }
}

// =============================================================================
// Source Row
// =============================================================================

/// A line item joined with its SKU's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSource {
    pub record: LineItemRecord,
    pub sku_code: String,
    pub item_name: String,
}

// =============================================================================
// Status
// =============================================================================

/// Reconciliation progress of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Nothing has been done yet.
    Open,
    /// Some units handled, some still open.
    PartiallyResolved,
    /// Nothing left to reconcile.
    Resolved,
}

/// Units still with the vendor keep a rejection open even when net
/// rejected is zero.
fn rejected_status(record: &LineItemRecord) -> ReportStatus {
    let open = record.net_rejected() + record.sent_to_vendor;
    if open == 0 {
        ReportStatus::Resolved
    } else if record.net_rejected() == record.rejected_quantity {
        ReportStatus::Open
    } else {
        ReportStatus::PartiallyResolved
    }
}

fn short_status(record: &LineItemRecord) -> ReportStatus {
    if record.available_short() == 0 {
        ReportStatus::Resolved
    } else if record.short_received_back == 0 {
        ReportStatus::Open
    } else {
        ReportStatus::PartiallyResolved
    }
}

// =============================================================================
// Rejected Items
// =============================================================================

/// One row of the rejected-items report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RejectedItemReport {
    pub line_item_id: String,
    pub shipment_id: String,
    pub sku_id: String,
    pub sku_code: String,
    pub item_name: String,
    pub vendor_id: String,
    pub brand_id: String,
    pub original_invoice_number: String,
    pub report_number: String,
    #[ts(as = "String")]
    pub received_date: NaiveDate,
    pub received_quantity: i64,
    pub rejected_quantity: i64,
    pub sent_to_vendor: i64,
    pub received_back: i64,
    pub scrapped: i64,
    pub net_rejected: i64,
    pub unit_price_cents: i64,
    pub status: ReportStatus,
    /// Version the row was read at, for the follow-up action.
    pub version: i64,
}

impl From<&ReportSource> for RejectedItemReport {
    fn from(source: &ReportSource) -> Self {
        let r = &source.record;
        RejectedItemReport {
            line_item_id: r.id.clone(),
            shipment_id: r.shipment_id.clone(),
            sku_id: r.sku_id.clone(),
            sku_code: source.sku_code.clone(),
            item_name: source.item_name.clone(),
            vendor_id: r.vendor_id.clone(),
            brand_id: r.brand_id.clone(),
            original_invoice_number: r.original_invoice_number.clone(),
            report_number: r.report_number.clone(),
            received_date: r.received_date,
            received_quantity: r.received_quantity,
            rejected_quantity: r.rejected_quantity,
            sent_to_vendor: r.sent_to_vendor,
            received_back: r.received_back,
            scrapped: r.scrapped,
            net_rejected: r.net_rejected(),
            unit_price_cents: r.unit_price_cents,
            status: rejected_status(r),
            version: r.version,
        }
    }
}

/// Builds the rejected-items report from joined rows.
///
/// Rows without rejections are skipped. Output is ordered by received
/// date, newest first, then by id.
pub fn rejected_item_reports(
    sources: &[ReportSource],
    filter: &ReportFilter,
) -> LedgerResult<Vec<RejectedItemReport>> {
    let filter = filter.normalized()?;
    let mut rows: Vec<RejectedItemReport> = sources
        .iter()
        .filter(|s| s.record.rejected_quantity > 0)
        .filter(|s| filter.matches(s))
        .map(RejectedItemReport::from)
        .filter(|row| !filter.outstanding_only || row.status != ReportStatus::Resolved)
        .collect();

    rows.sort_by(|a, b| {
        b.received_date
            .cmp(&a.received_date)
            .then_with(|| a.line_item_id.cmp(&b.line_item_id))
    });
    Ok(rows)
}

// =============================================================================
// Short Items
// =============================================================================

/// One row of the short-items report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShortItemReport {
    pub line_item_id: String,
    pub shipment_id: String,
    pub sku_id: String,
    pub sku_code: String,
    pub item_name: String,
    pub vendor_id: String,
    pub brand_id: String,
    pub original_invoice_number: String,
    pub report_number: String,
    #[ts(as = "String")]
    pub received_date: NaiveDate,
    pub short_quantity: i64,
    pub short_received_back: i64,
    pub available_short: i64,
    pub unit_price_cents: i64,
    /// Rejected line whose vendor return opened this obligation.
    pub source_line_item_id: Option<String>,
    pub status: ReportStatus,
    pub version: i64,
}

impl From<&ReportSource> for ShortItemReport {
    fn from(source: &ReportSource) -> Self {
        let r = &source.record;
        ShortItemReport {
            line_item_id: r.id.clone(),
            shipment_id: r.shipment_id.clone(),
            sku_id: r.sku_id.clone(),
            sku_code: source.sku_code.clone(),
            item_name: source.item_name.clone(),
            vendor_id: r.vendor_id.clone(),
            brand_id: r.brand_id.clone(),
            original_invoice_number: r.original_invoice_number.clone(),
            report_number: r.report_number.clone(),
            received_date: r.received_date,
            short_quantity: r.short_quantity,
            short_received_back: r.short_received_back,
            available_short: r.available_short(),
            unit_price_cents: r.unit_price_cents,
            source_line_item_id: r.source_line_item_id.clone(),
            status: short_status(r),
            version: r.version,
        }
    }
}

/// Builds the short-items report from joined rows.
pub fn short_item_reports(
    sources: &[ReportSource],
    filter: &ReportFilter,
) -> LedgerResult<Vec<ShortItemReport>> {
    let filter = filter.normalized()?;
    let mut rows: Vec<ShortItemReport> = sources
        .iter()
        .filter(|s| s.record.short_quantity > 0)
        .filter(|s| filter.matches(s))
        .map(ShortItemReport::from)
        .filter(|row| !filter.outstanding_only || row.status != ReportStatus::Resolved)
        .collect();

    rows.sort_by(|a, b| {
        b.received_date
            .cmp(&a.received_date)
            .then_with(|| a.line_item_id.cmp(&b.line_item_id))
    });
    Ok(rows)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewLineItem;
    use chrono::Utc;

    fn source(id: &str, day: u32, rejected: i64, short: i64, invoice: &str) -> ReportSource {
        let record = NewLineItem {
            shipment_id: "shp-1".into(),
            sku_id: "sku-1".into(),
            vendor_id: "ven-1".into(),
            brand_id: "brd-1".into(),
            original_invoice_number: invoice.into(),
            report_number: format!("GRN-{}", day),
            received_date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
            received_quantity: 20,
            rejected_quantity: rejected,
            short_quantity: short,
            unit_price_cents: 199,
            source_line_item_id: None,
        }
        .into_record(id.into(), "t-1", Utc::now())
        .unwrap();

        ReportSource {
            record,
            sku_code: "SKU-CAB-01".into(),
            item_name: "Cable Tie Pack".into(),
        }
    }

    #[test]
    fn test_rejected_report_projects_and_orders() {
        let sources = vec![
            source("b", 3, 4, 0, "INV-1"),
            source("a", 3, 2, 0, "INV-2"),
            source("c", 9, 1, 0, "INV-3"),
            source("d", 5, 0, 6, "INV-4"),
        ];

        let rows = rejected_item_reports(&sources, &ReportFilter::default()).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.line_item_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(rows[2].net_rejected, 4);
        assert_eq!(rows[2].status, ReportStatus::Open);

        let shorts = short_item_reports(&sources, &ReportFilter::default()).unwrap();
        assert_eq!(shorts.len(), 1);
        assert_eq!(shorts[0].available_short, 6);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let sources = vec![source("a", 1, 2, 0, "INV-778"), source("b", 2, 2, 0, "INV-900")];

        let by_invoice = ReportFilter {
            search: Some("inv-77".into()),
            ..Default::default()
        };
        assert_eq!(rejected_item_reports(&sources, &by_invoice).unwrap().len(), 1);

        let by_name = ReportFilter {
            search: Some("  cable TIE ".into()),
            ..Default::default()
        };
        assert_eq!(rejected_item_reports(&sources, &by_name).unwrap().len(), 2);

        let by_report = ReportFilter {
            search: Some("grn-2".into()),
            ..Default::default()
        };
        let rows = rejected_item_reports(&sources, &by_report).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line_item_id, "b");
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let sources = vec![
            source("a", 1, 1, 0, "INV-1"),
            source("b", 2, 1, 0, "INV-2"),
            source("c", 3, 1, 0, "INV-3"),
        ];
        let filter = ReportFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 5, 2),
            date_to: NaiveDate::from_ymd_opt(2026, 5, 3),
            ..Default::default()
        };
        let rows = rejected_item_reports(&sources, &filter).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let filter = ReportFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 5, 9),
            date_to: NaiveDate::from_ymd_opt(2026, 5, 1),
            ..Default::default()
        };
        assert!(matches!(
            rejected_item_reports(&[], &filter),
            Err(LedgerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_outstanding_only_hides_resolved_rows() {
        let mut done = source("a", 1, 3, 0, "INV-1");
        done.record.scrapped = 3;
        let mut with_vendor = source("b", 1, 3, 0, "INV-2");
        with_vendor.record.sent_to_vendor = 1;
        with_vendor.record.scrapped = 2;
        let sources = vec![done, with_vendor];

        let all = rejected_item_reports(&sources, &ReportFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, ReportStatus::Resolved);
        assert_eq!(all[1].status, ReportStatus::PartiallyResolved);

        let filter = ReportFilter {
            outstanding_only: true,
            ..Default::default()
        };
        let open = rejected_item_reports(&sources, &filter).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].line_item_id, "b");
    }

    #[test]
    fn test_report_row_wire_format() {
        let sources = vec![source("a", 1, 2, 0, "INV-1")];
        let rows = rejected_item_reports(&sources, &ReportFilter::default()).unwrap();
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["received_date"], "2026-05-01");
        assert_eq!(json["net_rejected"], 2);
    }

    #[test]
    fn test_listing_twice_is_identical() {
        let sources = vec![source("a", 1, 2, 2, "INV-1"), source("b", 4, 1, 0, "INV-2")];
        let filter = ReportFilter::default();
        assert_eq!(
            rejected_item_reports(&sources, &filter).unwrap(),
            rejected_item_reports(&sources, &filter).unwrap()
        );
        assert_eq!(
            short_item_reports(&sources, &filter).unwrap(),
            short_item_reports(&sources, &filter).unwrap()
        );
    }
}
