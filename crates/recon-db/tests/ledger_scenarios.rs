//! End-to-end ledger behavior against a real SQLite database.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::SqliteConnection;

use recon_core::ledger::{ReceiveBackShort, ReceiveFromVendor, Scrap, SendToVendor};
use recon_core::{
    LedgerContext, LedgerError, LineItemRecord, Money, MovementDirection, NewLineItem,
    NewStockMovement, PricePolicy, ReportFilter, ReportStatus, ResolutionAction,
};
use recon_db::{
    Database, DbConfig, DbError, ReconciliationLedger, SqliteSkuPrices, SqliteStockLog,
    StockLogError, StockMovementLog,
};

const TENANT: &str = "tenant-a";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn ctx() -> LedgerContext {
    LedgerContext::new(TENANT, "clerk-7")
}

struct Fixture {
    db: Database,
    ledger: ReconciliationLedger<SqliteStockLog, SqliteSkuPrices>,
    sku_id: String,
}

async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let sku = db
        .skus()
        .create(TENANT, "BRK-220", "Brake Pad Set", Money::from_cents(1250))
        .await
        .unwrap();
    let ledger = db.ledger(PricePolicy::default());
    Fixture {
        db,
        ledger,
        sku_id: sku.id,
    }
}

fn receipt(sku_id: &str, rejected: i64, short: i64) -> NewLineItem {
    NewLineItem {
        shipment_id: "SHP-9".into(),
        sku_id: sku_id.into(),
        vendor_id: "ven-acme".into(),
        brand_id: "brd-acme".into(),
        original_invoice_number: "INV-4411".into(),
        report_number: "GRN-0091".into(),
        received_date: day(2),
        received_quantity: 40,
        rejected_quantity: rejected,
        short_quantity: short,
        unit_price_cents: 1200,
        source_line_item_id: None,
    }
}

fn send(record_id: &str, quantity: i64) -> SendToVendor {
    SendToVendor {
        record_id: record_id.into(),
        quantity,
        vendor_id: "ven-acme".into(),
        brand_id: "brd-acme".into(),
        date: Some(day(4)),
        reason: "Cracked friction surface".into(),
        unit_price: None,
    }
}

fn receive(record_id: &str, quantity: i64, short_portion: Option<i64>) -> ReceiveFromVendor {
    ReceiveFromVendor {
        record_id: record_id.into(),
        quantity,
        vendor_id: "ven-acme".into(),
        brand_id: "brd-acme".into(),
        date: Some(day(12)),
        condition: "Replacement units".into(),
        short_portion,
        unit_price: None,
    }
}

fn scrap(record_id: &str, quantity: i64, approved_by: Option<&str>) -> Scrap {
    Scrap {
        record_id: record_id.into(),
        quantity,
        date: Some(day(5)),
        scrap_reason: "damaged".into(),
        approved_by: approved_by.map(str::to_string),
        justification: None,
    }
}

fn receive_back(record_id: &str, quantity: i64) -> ReceiveBackShort {
    ReceiveBackShort {
        record_id: record_id.into(),
        quantity,
        vendor_id: "ven-acme".into(),
        brand_id: "brd-acme".into(),
        date: Some(day(9)),
        invoice_reference: "INV-4411-B".into(),
        received_by: "dock-2".into(),
        unit_price: None,
    }
}

fn assert_conserved(record: &LineItemRecord) {
    assert_eq!(
        record.rejected_quantity,
        record.sent_to_vendor + record.received_back + record.scrapped + record.net_rejected()
    );
    assert!(record.net_rejected() >= 0);
    assert!(record.short_received_back <= record.short_quantity);
}

// =============================================================================
// Rejection lifecycle
// =============================================================================

#[tokio::test]
async fn rejection_lifecycle_with_short_vendor_return() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 10, 0)).await.unwrap();

    let sent = f.ledger.send_to_vendor(&ctx(), &send(&record.id, 6)).await.unwrap();
    assert_eq!(sent.record.sent_to_vendor, 6);
    assert_eq!(sent.record.net_rejected(), 4);

    let scrapped = f
        .ledger
        .scrap(&ctx(), &scrap(&record.id, 4, Some("lead-1")))
        .await
        .unwrap();
    assert_eq!(scrapped.record.scrapped, 4);
    assert_eq!(scrapped.record.net_rejected(), 0);
    assert!(scrapped.movement_id.is_none());

    let back = f
        .ledger
        .receive_from_vendor(&ctx(), &receive(&record.id, 6, Some(1)))
        .await
        .unwrap();
    assert_eq!(back.record.sent_to_vendor, 0);
    assert_eq!(back.record.received_back, 6);
    assert_eq!(back.record.version, 3);
    assert_conserved(&back.record);

    let movements = f
        .db
        .stock_movements()
        .list_for_line_item(TENANT, &record.id)
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].direction, MovementDirection::Outgoing);
    assert_eq!(movements[0].quantity, 6);
    assert_eq!(movements[1].direction, MovementDirection::Incoming);
    assert_eq!(movements[1].quantity, 5);
    assert_eq!(movements[1].short_quantity, 1);
    assert_eq!(movements[1].unit_price_cents, 1200);

    let obligation = back.spawned.unwrap();
    assert_eq!(obligation.short_quantity, 1);
    assert_eq!(obligation.source_line_item_id.as_deref(), Some(record.id.as_str()));

    let spawned = f
        .db
        .line_items()
        .list_spawned_from(TENANT, &record.id)
        .await
        .unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].id, obligation.id);
    assert_eq!(spawned[0].received_quantity, 5);
    assert_eq!(spawned[0].received_date, day(12));

    let actions: Vec<ResolutionAction> = f
        .ledger
        .history(&ctx(), &record.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            ResolutionAction::SendToVendor,
            ResolutionAction::Scrap,
            ResolutionAction::ReceiveFromVendor
        ]
    );
}

#[tokio::test]
async fn spawned_short_obligation_resolves_through_short_ledger() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 3, 0)).await.unwrap();
    f.ledger.send_to_vendor(&ctx(), &send(&record.id, 3)).await.unwrap();
    let back = f
        .ledger
        .receive_from_vendor(&ctx(), &receive(&record.id, 3, Some(3)))
        .await
        .unwrap();
    assert!(back.movement_id.is_none());
    let obligation = back.spawned.unwrap();

    let shorts = f
        .ledger
        .list_short_item_reports(&ctx(), &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(shorts.len(), 1);
    assert_eq!(shorts[0].line_item_id, obligation.id);
    assert_eq!(shorts[0].available_short, 3);
    assert_eq!(shorts[0].source_line_item_id.as_deref(), Some(record.id.as_str()));

    let done = f
        .ledger
        .receive_back_short(&ctx(), &receive_back(&obligation.id, 3))
        .await
        .unwrap();
    assert_eq!(done.record.available_short(), 0);

    let open = f
        .ledger
        .list_short_item_reports(
            &ctx(),
            &ReportFilter {
                outstanding_only: true,
                ..ReportFilter::default()
            },
        )
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn send_more_than_net_rejected_changes_nothing() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 5, 0)).await.unwrap();
    f.ledger.send_to_vendor(&ctx(), &send(&record.id, 5)).await.unwrap();

    let err = f.ledger.send_to_vendor(&ctx(), &send(&record.id, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidQuantity { requested: 1, available: 0, .. }
    ));

    let current = f.ledger.get_record(&ctx(), &record.id).await.unwrap();
    assert_eq!(current.sent_to_vendor, 5);
    assert_eq!(current.version, 1);
    assert_eq!(f.db.stock_movements().count(TENANT).await.unwrap(), 1);
    assert_eq!(f.db.history().count(TENANT).await.unwrap(), 1);
}

// =============================================================================
// Short ledger
// =============================================================================

#[tokio::test]
async fn short_receive_back_then_exhausted() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 0, 8)).await.unwrap();

    let outcome = f
        .ledger
        .receive_back_short(&ctx(), &receive_back(&record.id, 8))
        .await
        .unwrap();
    assert_eq!(outcome.record.short_received_back, 8);

    let movement = f
        .db
        .stock_movements()
        .get_by_id(TENANT, outcome.movement_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.direction, MovementDirection::Incoming);
    assert_eq!(movement.quantity, 8);
    assert_eq!(movement.reference.as_deref(), Some("INV-4411-B"));

    let err = f
        .ledger
        .receive_back_short(&ctx(), &receive_back(&record.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidQuantity { .. }));
    assert_eq!(f.db.stock_movements().count(TENANT).await.unwrap(), 1);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn scrap_without_approver_is_rejected() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 4, 0)).await.unwrap();

    let err = f
        .ledger
        .scrap(&ctx(), &scrap(&record.id, 2, None))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::MissingField {
            field: "approved_by".into()
        }
    );

    let current = f.ledger.get_record(&ctx(), &record.id).await.unwrap();
    assert_eq!(current.scrapped, 0);
    assert_eq!(current.version, record.version);
    assert!(f.ledger.history(&ctx(), &record.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_and_negative_quantities_are_rejected() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 4, 2)).await.unwrap();

    for quantity in [0, -1] {
        let err = f
            .ledger
            .send_to_vendor(&ctx(), &send(&record.id, quantity))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity { .. }));

        let err = f
            .ledger
            .receive_back_short(&ctx(), &receive_back(&record.id, quantity))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity { .. }));
    }

    assert_eq!(f.ledger.get_record(&ctx(), &record.id).await.unwrap().version, 0);
}

// =============================================================================
// Atomicity
// =============================================================================

struct FailingStockLog;

#[async_trait]
impl StockMovementLog for FailingStockLog {
    async fn append(
        &self,
        _conn: &mut SqliteConnection,
        _tenant_id: &str,
        _movement: &NewStockMovement,
    ) -> Result<String, StockLogError> {
        Err(StockLogError::Db(DbError::Internal("inventory service down".into())))
    }
}

#[tokio::test]
async fn failed_stock_append_rolls_back_counters() {
    let f = fixture().await;
    let record = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 6, 0)).await.unwrap();

    let failing = ReconciliationLedger::new(
        f.db.pool().clone(),
        FailingStockLog,
        SqliteSkuPrices,
        PricePolicy::default(),
    );

    let err = failing.send_to_vendor(&ctx(), &send(&record.id, 2)).await.unwrap_err();
    assert!(matches!(err, LedgerError::StockLogFailure(_)));

    let current = f.ledger.get_record(&ctx(), &record.id).await.unwrap();
    assert_eq!(current.sent_to_vendor, 0);
    assert_eq!(current.version, 0);
    assert_eq!(f.db.history().count(TENANT).await.unwrap(), 0);

    // Scrap has no physical effect, so the broken log is never called.
    let outcome = failing
        .scrap(&ctx(), &scrap(&record.id, 1, Some("lead-1")))
        .await
        .unwrap();
    assert_eq!(outcome.record.scrapped, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_sends_never_oversend() {
    let path = std::env::temp_dir().join(format!("recon-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(4))
        .await
        .unwrap();
    let sku = db
        .skus()
        .create(TENANT, "BRK-220", "Brake Pad Set", Money::from_cents(1250))
        .await
        .unwrap();
    let ledger = db.ledger(PricePolicy::default());
    let record = ledger.record_receipt(&ctx(), receipt(&sku.id, 5, 0)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let ledger = ledger.clone();
        let cmd = send(&record.id, 2);
        handles.push(tokio::spawn(async move { ledger.send_to_vendor(&ctx(), &cmd).await }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(LedgerError::ConcurrentModification { .. }) | Err(LedgerError::InvalidQuantity { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let current = ledger.get_record(&ctx(), &record.id).await.unwrap();
    assert!((1..=2).contains(&committed));
    assert_eq!(current.sent_to_vendor, 2 * committed);
    assert_eq!(current.version, committed);
    assert_conserved(&current);
    assert_eq!(db.stock_movements().count(TENANT).await.unwrap(), committed);

    db.close().await;
    let _ = std::fs::remove_file(&path);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn reports_reflect_counters_and_filters() {
    let f = fixture().await;
    let first = f.ledger.record_receipt(&ctx(), receipt(&f.sku_id, 10, 0)).await.unwrap();
    let mut later = receipt(&f.sku_id, 2, 0);
    later.received_date = day(20);
    later.original_invoice_number = "INV-9000".into();
    let second = f.ledger.record_receipt(&ctx(), later).await.unwrap();

    f.ledger.send_to_vendor(&ctx(), &send(&first.id, 6)).await.unwrap();
    f.ledger
        .scrap(&ctx(), &scrap(&second.id, 2, Some("lead-1")))
        .await
        .unwrap();

    let all = f
        .ledger
        .list_rejected_item_reports(&ctx(), &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].line_item_id, second.id);
    assert_eq!(all[0].status, ReportStatus::Resolved);
    assert_eq!(all[1].net_rejected, 4);
    assert_eq!(all[1].status, ReportStatus::PartiallyResolved);
    assert_eq!(all[1].sku_code, "BRK-220");

    let again = f
        .ledger
        .list_rejected_item_reports(&ctx(), &ReportFilter::default())
        .await
        .unwrap();
    assert_eq!(all, again);

    let searched = f
        .ledger
        .list_rejected_item_reports(
            &ctx(),
            &ReportFilter {
                search: Some("  brake PAD ".into()),
                date_to: Some(day(10)),
                ..ReportFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].line_item_id, first.id);

    let outstanding = f
        .ledger
        .list_rejected_item_reports(
            &ctx(),
            &ReportFilter {
                outstanding_only: true,
                ..ReportFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outstanding.len(), 1);

    let payload = serde_json::to_value(&outstanding[0]).unwrap();
    assert_eq!(payload["net_rejected"], json!(4));
    assert_eq!(payload["sent_to_vendor"], json!(6));
    assert_eq!(payload["status"], json!("partially_resolved"));

    let err = f
        .ledger
        .list_rejected_item_reports(
            &ctx(),
            &ReportFilter {
                date_from: Some(day(20)),
                date_to: Some(day(1)),
                ..ReportFilter::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput { .. }));
}

#[tokio::test]
async fn explicit_price_becomes_record_price() {
    let f = fixture().await;
    let mut unpriced = receipt(&f.sku_id, 4, 0);
    unpriced.unit_price_cents = 0;
    let record = f.ledger.record_receipt(&ctx(), unpriced).await.unwrap();

    let mut cmd = send(&record.id, 1);
    cmd.unit_price = Some(Money::from_cents(999));
    let outcome = f.ledger.send_to_vendor(&ctx(), &cmd).await.unwrap();
    assert_eq!(outcome.record.unit_price_cents, 999);

    // No explicit price: record price (999) wins over the catalog (1250).
    let outcome = f.ledger.send_to_vendor(&ctx(), &send(&record.id, 1)).await.unwrap();
    let movement = f
        .db
        .stock_movements()
        .get_by_id(TENANT, outcome.movement_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.unit_price_cents, 999);
    assert!(outcome.record.updated_at <= Utc::now());
}

#[tokio::test]
async fn short_obligation_opened_without_a_price_picks_up_the_catalog_price() {
    let f = fixture().await;
    let ctx = ctx();
    f.db
        .skus()
        .update_price(TENANT, &f.sku_id, Money::from_cents(0))
        .await
        .unwrap();

    let mut unpriced = receipt(&f.sku_id, 3, 0);
    unpriced.unit_price_cents = 0;
    let record = f.ledger.record_receipt(&ctx, unpriced).await.unwrap();

    f.ledger.send_to_vendor(&ctx, &send(&record.id, 2)).await.unwrap();
    let returned = f
        .ledger
        .receive_from_vendor(&ctx, &receive(&record.id, 2, Some(1)))
        .await
        .unwrap();
    let obligation = returned.spawned.unwrap();
    assert_eq!(obligation.unit_price_cents, 0);

    f.db
        .skus()
        .update_price(TENANT, &f.sku_id, Money::from_cents(1250))
        .await
        .unwrap();

    let outcome = f
        .ledger
        .receive_back_short(&ctx, &receive_back(&obligation.id, 1))
        .await
        .unwrap();
    let movement = f
        .db
        .stock_movements()
        .get_by_id(TENANT, outcome.movement_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.unit_price_cents, 1250);
    assert_eq!(outcome.record.available_short(), 0);
}
