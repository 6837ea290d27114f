//! # Repository Module
//!
//! Database repository implementations for the reconciliation ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Pool-backed reads (reports, lookups)                                  │
//! │       db.line_items().get_by_id(tenant, id)                            │
//! │       db.history().list_for_line_item(tenant, id)                      │
//! │                                                                         │
//! │  Connection-scoped writes (inside a ledger transaction)                │
//! │       LineItemRepository::update_counters_in(&mut tx, ..)              │
//! │       StockMovementLog::append(&mut tx, ..)                            │
//! │       HistoryRepository::insert_in(&mut tx, ..)                        │
//! │                                                                         │
//! │  Writes never run on the pool directly from the ledger, so one         │
//! │  operation's rows commit or roll back together.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LineItemRepository`](line_item::LineItemRepository) - Counters, receipts, report rows
//! - [`SkuRepository`](sku::SkuRepository) - Catalog, plus the `PriceLookup` seam
//! - [`StockMovementRepository`](stock_movement::StockMovementRepository) - Stock log reads, plus the `StockMovementLog` seam
//! - [`HistoryRepository`](history::HistoryRepository) - Resolution history

pub mod history;
pub mod line_item;
pub mod sku;
pub mod stock_movement;
