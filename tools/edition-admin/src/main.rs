//! Edition Admin: operator CLI for the edition ledger.
//!
//! Runs assignment, audits and lifecycle events against the file-backed store
//! in `--data-dir`. Only one process may hold the data directory at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use edition_assignment::{
    AssignmentError, AssignmentReport, EditionAssignmentApi, EditionAssignmentService,
    EditionConfig, FileBackedEditionStore, InMemoryProductLocks, IntegrityViolation, LineItem,
    LineItemId, LineItemLifecycleApi, Product, ProductId,
};
use edition_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

type Service =
    EditionAssignmentService<FileBackedEditionStore, FileBackedEditionStore, InMemoryProductLocks>;

/// Edition Admin: assign, audit and repair edition numbers
#[derive(Parser, Debug)]
#[command(name = "edition-admin")]
#[command(about = "Assign, audit and repair artwork edition numbers")]
struct Args {
    /// Directory holding editions.json
    #[arg(short, long, default_value = "./edition-data")]
    data_dir: PathBuf,

    /// Reject products with no catalog record instead of numbering them as open
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print Prometheus metrics after the command
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// (Re)number the active line items of one product
    Assign { product: String },
    /// Assign every product with active line items
    AssignAll,
    /// Show the numbering an assignment would produce
    Preview { product: String },
    /// Audit the stored numbering
    Verify { product: String },
    /// Record an NFC claim, freezing the item's number
    Claim {
        line_item: String,
        /// Claim time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Cancel, refund or restock a line item
    Deactivate { line_item: String },
    /// List a product's line items
    Show { product: String },
    /// Create or update a product
    AddProduct {
        id: String,
        /// Edition size; omit or 0 for an open edition
        #[arg(long)]
        size: Option<u32>,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Record a purchase and number it
    AddItem {
        product: String,
        line_item: String,
        #[arg(long)]
        order: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if args.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    let _telemetry = init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let mut config = EditionConfig::from_env();
    config.strict_product_lookup |= args.strict;

    let store = Arc::new(open_store(&args.data_dir, &config)?);
    info!("[editions] Using {}", store.path().display());

    let service = EditionAssignmentService::new(
        store.clone(),
        store.clone(),
        Arc::new(InMemoryProductLocks::new()),
        config,
    );

    let result = run(args.command, &service, &store).await;

    if args.print_metrics {
        print!("{}", encode_metrics()?);
    }
    result
}

async fn run(command: Command, service: &Service, store: &FileBackedEditionStore) -> Result<()> {
    match command {
        Command::Assign { product } => {
            let product_id = parse_product(&product)?;
            let report = service
                .assign_editions(&product_id)
                .await
                .map_err(oversell_alarm)?;
            print_report(&report);
        }
        Command::AssignAll => {
            let results = service.assign_all().await?;
            let mut failed = 0;
            for (product_id, result) in results {
                match result {
                    Ok(report) => print_report(&report),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {}", product_id, oversell_alarm(e));
                    }
                }
            }
            if failed > 0 {
                bail!("{} product(s) failed", failed);
            }
        }
        Command::Preview { product } => {
            let product_id = parse_product(&product)?;
            let plan = service
                .preview_assignment(&product_id)
                .await
                .map_err(oversell_alarm)?;
            println!(
                "{} ({:?}): {} items, reserved {:?}",
                plan.product_id, plan.kind, plan.writes.len(), plan.reserved
            );
            for write in &plan.writes {
                let marker = if write.is_change() { "*" } else { " " };
                println!(
                    "{} {:<24} {:>6} (was {})",
                    marker,
                    write.line_item_id,
                    write.edition_number,
                    write
                        .previous_number
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Command::Verify { product } => {
            let product_id = parse_product(&product)?;
            let report = service.verify_editions(&product_id).await?;
            println!(
                "{}: {} active, {} claimed ({} frozen)",
                report.product_id, report.active_items, report.claimed_items, report.frozen_items
            );
            for violation in &report.violations {
                println!("  {}", describe(violation));
            }
            if !report.is_clean() {
                bail!("{} violation(s) found", report.violations.len());
            }
            println!("OK");
        }
        Command::Claim { line_item, at } => {
            let claimed_at = match at {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("Invalid --at timestamp: {}", raw))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let item = service
                .claim(&LineItemId::new(line_item), claimed_at)
                .await?;
            println!("{}", describe_item(&item));
        }
        Command::Deactivate { line_item } => {
            let report = service
                .deactivate(&LineItemId::new(line_item))
                .await
                .map_err(oversell_alarm)?;
            print_report(&report);
        }
        Command::Show { product } => {
            let product_id = parse_product(&product)?;
            let tables = store.snapshot();
            match tables.product(&product_id) {
                Some(p) => println!("{} {:?} size={:?}", p.id, p.title, p.edition_size),
                None => println!("{} (no product record)", product_id),
            }
            let mut items = tables.items_for_product(&product_id);
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            for item in &items {
                println!("  {}", describe_item(item));
            }
        }
        Command::AddProduct { id, size, title } => {
            let product = Product::new(parse_product(&id)?, size).with_title(title);
            store.upsert_product(product.clone())?;
            println!("{} {:?}", product.id, product.edition_kind());
        }
        Command::AddItem {
            product,
            line_item,
            order,
        } => {
            let mut item = LineItem::new(
                LineItemId::new(line_item),
                parse_product(&product)?,
                Utc::now(),
            );
            if let Some(order) = order {
                item = item.with_order(order);
            }
            let report = service
                .record_purchase(item)
                .await
                .map_err(oversell_alarm)?;
            print_report(&report);
        }
    }
    Ok(())
}

/// Open the file store, waiting at most the configured lock timeout for
/// another process to release the data directory.
fn open_store(data_dir: &Path, config: &EditionConfig) -> Result<FileBackedEditionStore> {
    FileBackedEditionStore::open(data_dir, config.lock_timeout())
        .with_context(|| format!("Failed to open data dir {}", data_dir.display()))
}

fn parse_product(raw: &str) -> Result<ProductId> {
    Ok(ProductId::parse(raw)?)
}

fn oversell_alarm(err: AssignmentError) -> anyhow::Error {
    if err.is_capacity_exceeded() {
        eprintln!("OVERSELL ALARM: {}", err);
    }
    err.into()
}

fn print_report(report: &AssignmentReport) {
    println!(
        "{}: assigned {} ({} renumbered, {} reserved) {:?}",
        report.product_id, report.assigned, report.renumbered, report.reserved, report.kind
    );
}

fn describe_item(item: &LineItem) -> String {
    format!(
        "{:<24} {:<8} {:<10} {}{}",
        item.id,
        format!("{:?}", item.status).to_lowercase(),
        item.label()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string()),
        item.created_at.to_rfc3339(),
        item.nfc_claimed_at
            .map(|at| format!(" claimed {}", at.to_rfc3339()))
            .unwrap_or_default()
    )
}

fn describe(violation: &IntegrityViolation) -> String {
    match violation {
        IntegrityViolation::DuplicateNumber {
            edition_number,
            line_items,
        } => format!("duplicate #{} held by {:?}", edition_number, line_items),
        IntegrityViolation::OverCapacity {
            line_item_id,
            edition_number,
            edition_size,
        } => format!(
            "{} holds #{} above edition size {}",
            line_item_id, edition_number, edition_size
        ),
        IntegrityViolation::TotalMismatch {
            line_item_id,
            expected,
            actual,
        } => format!(
            "{} total {:?}, expected {:?}",
            line_item_id, actual, expected
        ),
        IntegrityViolation::Unnumbered { line_item_id } => {
            format!("{} is active but unnumbered", line_item_id)
        }
        IntegrityViolation::Gap { missing } => format!("gap at #{}", missing),
    }
}
