//! # Seed Data Generator
//!
//! Populates a ledger database with receipts and some resolution activity
//! for development and report testing.
//!
//! ## Usage
//! ```bash
//! # Generate 500 receipts (default)
//! cargo run -p recon-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p recon-db --bin seed -- --count 2000
//!
//! # Specify database path (overrides recon.toml / RECON_DB_PATH)
//! cargo run -p recon-db --bin seed -- --db ./data/recon.db
//! ```
//!
//! ## Generated Data
//! - One SKU per catalog entry below; list prices are decimal strings
//!   rounded to minor units by `Money::parse_decimal`
//! - `count` receipts cycling over SKUs, vendors and dates, each with some
//!   rejected and/or short units
//! - A deterministic share of receipts pushed through send, receive,
//!   scrap and receive-back so every report status shows up

use chrono::{Duration, NaiveDate};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use recon_core::ledger::{ReceiveBackShort, ReceiveFromVendor, Scrap, SendToVendor};
use recon_core::{LedgerContext, LineItemRecord, Money, NewLineItem};
use recon_db::{Database, ReconConfig, ReconciliationLedger, SqliteSkuPrices, SqliteStockLog};

/// Catalog entries: (code, name, unit price as written on the price list).
const CATALOG: &[(&str, &str, &str)] = &[
    ("HW-BOLT-M8", "Hex Bolt M8", "0.45"),
    ("HW-NUT-M8", "Hex Nut M8", "0.12"),
    ("HW-WSH-M8", "Flat Washer M8", "0.049"),
    ("EL-CBL-2M", "Power Cable 2m", "8.99"),
    ("EL-PLG-UK", "Plug Adapter", "3.49"),
    ("EL-SW-1G", "Wall Switch 1-Gang", "5.745"),
    ("PL-PIPE-20", "PVC Pipe 20mm", "2.6"),
    ("PL-ELB-20", "PVC Elbow 20mm", "0.85"),
    ("PT-WHT-1L", "White Paint 1L", "12.99"),
    ("PT-BRSH-2", "Paint Brush 2in", "1.99"),
    ("TL-HMR-16", "Claw Hammer 16oz", "18.50"),
    ("TL-SCR-PH2", "Screwdriver PH2", "0"),
];

const VENDORS: &[(&str, &str)] = &[
    ("ven-acme", "brd-acme"),
    ("ven-northwind", "brd-nw-pro"),
    ("ven-globex", "brd-globex"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,recon=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Reconciliation Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of receipts to generate (default: 500)");
                println!("  -d, --db <PATH>      Database file path (default: from config)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = ReconConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(path = ?config.database.path, count, "Seeding ledger database");

    let db = Database::new(config.db_config()).await?;
    let tenant_id = config.ledger.tenant_id.clone();

    let existing = db.line_items().count(&tenant_id).await?;
    if existing > 0 {
        warn!(existing, "Database already has line items, skipping seed");
        return Ok(());
    }

    let mut sku_ids = Vec::with_capacity(CATALOG.len());
    let mut prices = Vec::with_capacity(CATALOG.len());
    for (code, name, listed) in CATALOG {
        let price = Money::parse_decimal(listed)?;
        let sku = db.skus().create(&tenant_id, code, name, price).await?;
        sku_ids.push(sku.id);
        prices.push(price);
    }
    info!(skus = sku_ids.len(), "Catalog created");

    let ledger = db.ledger(config.price_policy()?);
    let ctx = LedgerContext::new(tenant_id, "seed");
    let base_date = NaiveDate::from_ymd_opt(2026, 1, 5).ok_or("invalid base date")?;

    let start = std::time::Instant::now();
    let mut generated = 0usize;
    let mut actions = 0usize;

    for seed in 0..count {
        let receipt = generate_receipt(&sku_ids, &prices, seed, base_date);
        let record = match ledger.record_receipt(&ctx, receipt).await {
            Ok(record) => record,
            Err(e) => {
                warn!(seed, error = %e, "Failed to record receipt");
                continue;
            }
        };
        generated += 1;

        match simulate_activity(&ledger, &ctx, &record, seed).await {
            Ok(n) => actions += n,
            Err(e) => warn!(record_id = %record.id, error = %e, "Activity failed"),
        }

        if generated % 100 == 0 {
            info!(generated, "Receipts recorded");
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        actions,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Builds one receipt from a seed. Every receipt has something to reconcile.
fn generate_receipt(
    sku_ids: &[String],
    prices: &[Money],
    seed: usize,
    base_date: NaiveDate,
) -> NewLineItem {
    let (vendor_id, brand_id) = VENDORS[seed % VENDORS.len()];
    let price = prices[seed % prices.len()];

    let received = 10 + ((seed * 7) % 90) as i64;
    let rejected = if seed % 4 == 3 { 0 } else { 1 + ((seed * 3) % 12) as i64 };
    let short = if seed % 3 == 0 || rejected == 0 {
        1 + ((seed * 5) % 6) as i64
    } else {
        0
    };

    NewLineItem {
        shipment_id: format!("SHP-{:05}", seed / 4),
        sku_id: sku_ids[seed % sku_ids.len()].clone(),
        vendor_id: vendor_id.to_string(),
        brand_id: brand_id.to_string(),
        original_invoice_number: format!("INV-{:06}", 100_000 + seed / 4),
        report_number: format!("GRN-{:06}", 500_000 + seed),
        received_date: base_date + Duration::days((seed % 90) as i64),
        received_quantity: received,
        rejected_quantity: rejected,
        short_quantity: short,
        unit_price_cents: if seed % 5 == 0 { 0 } else { price.cents() },
        source_line_item_id: None,
    }
}

/// Pushes a share of records through the ledger. Returns the number of
/// committed actions.
async fn simulate_activity(
    ledger: &ReconciliationLedger<SqliteStockLog, SqliteSkuPrices>,
    ctx: &LedgerContext,
    record: &LineItemRecord,
    seed: usize,
) -> recon_core::LedgerResult<usize> {
    let mut actions = 0;
    let date = Some(record.received_date + Duration::days(2));

    if record.rejected_quantity > 0 && seed % 2 == 0 {
        let sent = (record.rejected_quantity + 1) / 2;
        ledger
            .send_to_vendor(
                ctx,
                &SendToVendor {
                    record_id: record.id.clone(),
                    quantity: sent,
                    vendor_id: record.vendor_id.clone(),
                    brand_id: record.brand_id.clone(),
                    date,
                    reason: "Failed incoming inspection".into(),
                    unit_price: None,
                },
            )
            .await?;
        actions += 1;

        if seed % 6 == 0 {
            ledger
                .receive_from_vendor(
                    ctx,
                    &ReceiveFromVendor {
                        record_id: record.id.clone(),
                        quantity: sent,
                        vendor_id: record.vendor_id.clone(),
                        brand_id: record.brand_id.clone(),
                        date: Some(record.received_date + Duration::days(9)),
                        condition: "Replaced".into(),
                        short_portion: (sent > 1 && seed % 12 == 0).then_some(1),
                        unit_price: None,
                    },
                )
                .await?;
            actions += 1;
        }
    }

    if record.rejected_quantity > 1 && seed % 5 == 1 {
        ledger
            .scrap(
                ctx,
                &Scrap {
                    record_id: record.id.clone(),
                    quantity: 1,
                    date,
                    scrap_reason: "damaged".into(),
                    approved_by: Some("warehouse-lead".into()),
                    justification: None,
                },
            )
            .await?;
        actions += 1;
    }

    if record.short_quantity > 0 && seed % 3 == 0 && seed % 9 != 0 {
        ledger
            .receive_back_short(
                ctx,
                &ReceiveBackShort {
                    record_id: record.id.clone(),
                    quantity: record.short_quantity,
                    vendor_id: record.vendor_id.clone(),
                    brand_id: record.brand_id.clone(),
                    date: Some(record.received_date + Duration::days(5)),
                    invoice_reference: format!("{}-B", record.original_invoice_number),
                    received_by: "seed".into(),
                    unit_price: None,
                },
            )
            .await?;
        actions += 1;
    }

    Ok(actions)
}
