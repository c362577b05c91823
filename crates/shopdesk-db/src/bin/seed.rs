//! # Seed Data Generator
//!
//! Populates a database with demo products, customers and a few sale
//! documents for development.
//!
//! ## Usage
//! ```bash
//! # 200 products, 20 customers, demo documents (defaults)
//! cargo run -p shopdesk-db --bin seed
//!
//! # Custom amounts and database
//! cargo run -p shopdesk-db --bin seed -- --products 1000 --customers 50 --db ./data/shop.db
//!
//! # Products and customers only
//! cargo run -p shopdesk-db --bin seed -- --no-documents
//! ```
//!
//! Without `--db` the path comes from `SHOPDESK_DB_PATH` or the platform
//! data directory.

use std::env;
use std::path::PathBuf;

use serde::Serialize;
use shopdesk_core::{Customer, DocumentKind, Money, NewDocument, Product};
use shopdesk_db::{Database, StoreConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product families; each gets every size below.
const FAMILIES: &[(&str, i64)] = &[
    ("Basmati Rice", 32000),
    ("Sugar", 14500),
    ("Cooking Oil", 52000),
    ("Tea Leaves", 21000),
    ("Lentils", 28000),
    ("Flour", 18000),
    ("Milk Pack", 2200),
    ("Biscuits", 6000),
    ("Soap", 9500),
    ("Detergent", 34000),
];

const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 40), ("Large", 90), ("Family", 160)];

const CUSTOMER_NAMES: &[&str] = &[
    "Ayesha Khan",
    "Bilal Ahmed",
    "Sana Tariq",
    "Usman Ali",
    "Hira Shah",
    "Kamran Javed",
    "Nadia Iqbal",
    "Omar Farooq",
    "Zainab Raza",
    "Faisal Malik",
];

#[derive(Debug, Serialize)]
struct SeedSummary {
    store: String,
    database: String,
    products: usize,
    customers: usize,
    documents: Vec<String>,
    low_stock: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut product_count: usize = 200;
    let mut customer_count: usize = 20;
    let mut with_documents = true;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(product_count);
                    i += 1;
                }
            }
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    customer_count = args[i + 1].parse().unwrap_or(customer_count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--no-documents" => with_documents = false,
            "--help" | "-h" => {
                println!("shopdesk seed data generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>   Number of products (default: 200)");
                println!("  -c, --customers <N>  Number of customers (default: 20)");
                println!("  -d, --db <PATH>      Database file (default: SHOPDESK_DB_PATH or data dir)");
                println!("      --no-documents   Skip the demo POS tickets and invoices");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut store = StoreConfig::from_env();
    if db_path.is_some() {
        store.database_path = db_path;
    }
    let db_config = store.db_config()?;
    let database = db_config.database_path.display().to_string();

    info!(database = %database, products = product_count, customers = customer_count, "Seeding");

    let db = Database::new(db_config).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products; skipping seed");
        return Ok(());
    }

    // Products
    let mut products = Vec::with_capacity(product_count);
    for seed in 0..product_count {
        let product = generate_product(seed);
        match db.products().insert(&product).await {
            Ok(p) => products.push(p),
            Err(e) => warn!(name = %product.name, error = %e, "Failed to insert product"),
        }
    }
    info!(count = products.len(), "Products inserted");

    // Customers
    let mut customers = Vec::with_capacity(customer_count);
    for seed in 0..customer_count {
        let customer = generate_customer(seed);
        match db.customers().insert(&customer).await {
            Ok(c) => customers.push(c),
            Err(e) => warn!(name = %customer.name, error = %e, "Failed to insert customer"),
        }
    }
    info!(count = customers.len(), "Customers inserted");

    // Demo documents
    let mut documents = Vec::new();
    if with_documents && products.len() >= 3 && !customers.is_empty() {
        let engine = db.engine();

        // Paid POS ticket for a registered customer (correlated by phone).
        let walk_in = NewDocument::pos(customers[0].name.clone(), Some(customers[0].phone.clone()));
        let ticket = engine.create_document(walk_in).await?;
        engine.add_item(&ticket.id, &products[0].id, 2, None).await?;
        engine.add_item(&ticket.id, &products[1].id, 1, None).await?;
        engine.update_discount(&ticket.id, Money::from_cents(100)).await?;
        let ticket = engine.make_payment(&ticket.id).await?;
        documents.push(ticket.number);

        // Open invoice for the same customer.
        let invoice = engine
            .create_document(NewDocument::invoice(customers[0].id.clone()))
            .await?;
        engine.add_item(&invoice.id, &products[2].id, 3, None).await?;
        documents.push(invoice.number);

        // Anonymous POS ticket left unpaid.
        let open = engine
            .create_document(NewDocument::pos("Walk-in", None))
            .await?;
        engine.add_item(&open.id, &products[1].id, 1, None).await?;
        documents.push(open.number);

        let reconciled = engine.reconcile_customer(&customers[0].id).await?;
        info!(
            customer = %reconciled.name,
            total_purchases = %store.format_currency(reconciled.total_purchases_cents),
            outstanding = %store.format_currency(reconciled.outstanding_balance_cents),
            "Demo customer"
        );

        let pos_count = db.documents().count(DocumentKind::Pos).await?;
        info!(pos_count, "Demo documents created");
    }

    let low_stock = db.products().low_stock(1000).await?.len();

    let summary = SeedSummary {
        store: store.store_name.clone(),
        database,
        products: products.len(),
        customers: customers.len(),
        documents,
        low_stock,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=shopdesk_db=trace` - Trace this crate only
/// - Default: `info,shopdesk=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shopdesk=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// A product with deterministic pseudo-random price and stock.
fn generate_product(seed: usize) -> Product {
    let (family, base) = FAMILIES[seed % FAMILIES.len()];
    let (size, addon_pct) = SIZES[(seed / FAMILIES.len()) % SIZES.len()];
    let batch = seed / (FAMILIES.len() * SIZES.len());

    let name = if batch == 0 {
        format!("{} {}", family, size)
    } else {
        format!("{} {} #{}", family, size, batch + 1)
    };

    let price = base + base * addon_pct / 100;
    let mut product = Product::new(name, Money::from_cents(price), ((seed * 7) % 60) as i64);
    product.barcode = Some(format!("590{:010}", seed));
    product.buying_price_cents = price * (70 + (seed % 15) as i64) / 100;
    product.low_stock_threshold = 5 + (seed % 6) as i64;
    product
}

/// A customer with a unique 11-digit phone.
fn generate_customer(seed: usize) -> Customer {
    let name = CUSTOMER_NAMES[seed % CUSTOMER_NAMES.len()];
    let name = if seed < CUSTOMER_NAMES.len() {
        name.to_string()
    } else {
        format!("{} {}", name, seed / CUSTOMER_NAMES.len() + 1)
    };

    let mut customer = Customer::new(name, format!("0300{:07}", 1_000_000 + seed));
    customer.email = Some(format!("customer{}@example.com", seed));
    customer
}
