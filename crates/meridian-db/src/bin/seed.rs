//! # Seed Data Generator
//!
//! Populates the database with test catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Generate 2,000 products (default)
//! cargo run -p meridian-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p meridian-db --bin seed -- --count 5000
//!
//! # Specify database path and branch
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db --branch branch-1
//! ```
//!
//! ## Generated Data
//! Creates realistic garment catalog data:
//! - Product name x color x size variants
//! - Unique barcode per variant
//! - B2B price below B2C price, purchase price below both
//! - Random stock 0-50 (so some products start inactive)
//! - Tax rates: 0%, 5%, 8.25%, 10%
//! - A handful of B2B and B2C customers

use chrono::Utc;
use std::env;
use uuid::Uuid;

use meridian_core::{Customer, CustomerType, Product, ProductStatus};
use meridian_db::{Database, DbConfig};

/// Garment styles for realistic test data
const STYLES: &[&str] = &[
    "Linen Shirt",
    "Oxford Shirt",
    "Flannel Shirt",
    "Polo Shirt",
    "Crew T-Shirt",
    "V-Neck T-Shirt",
    "Hooded Sweatshirt",
    "Zip Hoodie",
    "Crewneck Sweater",
    "Cardigan",
    "Denim Jacket",
    "Bomber Jacket",
    "Chino Trousers",
    "Slim Jeans",
    "Straight Jeans",
    "Cargo Shorts",
    "Jogger Pants",
    "Pleated Skirt",
    "Maxi Dress",
    "Wrap Dress",
];

/// Colour variants
const COLORS: &[&str] = &[
    "Black", "White", "Navy", "Grey", "Olive", "Burgundy", "Beige", "Sky Blue",
];

/// Size variants
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "FREE"];

/// Tax rates in basis points
const TAX_RATES: &[u32] = &[0, 500, 825, 1000];

/// Sample customers seeded alongside the catalog
const CUSTOMERS: &[(&str, CustomerType)] = &[
    ("Walk-in Counter", CustomerType::B2c),
    ("Amara Boutique", CustomerType::B2b),
    ("Harbor Outfitters", CustomerType::B2b),
    ("Lena Fischer", CustomerType::B2c),
    ("Tariq Mahmood", CustomerType::B2c),
    ("Crescent Wholesale", CustomerType::B2b),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 2000;
    let mut db_path = String::from("./meridian_dev.db");
    let mut branch_id = String::from("branch-1");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(2000);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--branch" | "-b" => {
                if i + 1 < args.len() {
                    branch_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of products to generate (default: 2000)");
                println!("  -d, --db <PATH>     Database file path (default: ./meridian_dev.db)");
                println!("  -b, --branch <ID>   Branch to seed into (default: branch-1)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Meridian POS Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!("Branch:   {}", branch_id);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count(&branch_id).await?;
    if existing > 0 {
        println!("⚠ Branch already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Seed customers first so invoices can be created right away
    println!();
    println!("Generating customers...");

    for (name, tier) in CUSTOMERS {
        let customer = generate_customer(&branch_id, name, *tier);
        db.customers().insert(&customer).await?;
    }
    println!("✓ Generated {} customers", CUSTOMERS.len());

    // Generate products
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (style_idx, style) in STYLES.iter().enumerate() {
        for (color_idx, color) in COLORS.iter().enumerate() {
            for (size_idx, size) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = style_idx * 1000 + color_idx * 50 + size_idx;
                let product = generate_product(&branch_id, style, color, size, seed);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.barcode, e);
                    continue;
                }

                generated += 1;

                if generated % 500 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    // Sanity checks
    println!();
    println!("Verifying catalog...");
    let summary = db.products().stock_summary(&branch_id, 5).await?;
    println!("  Products:      {}", summary.product_count);
    println!("  Units on hand: {}", summary.total_units);
    println!("  Out of stock:  {}", summary.out_of_stock_count);
    println!("  Low stock:     {}", summary.low_stock_count);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product variant with realistic data.
fn generate_product(branch_id: &str, style: &str, color: &str, size: &str, seed: usize) -> Product {
    let now = Utc::now();

    // Barcode: deterministic per variant, unique within the branch
    let barcode = format!("890{:010}", seed);

    // Retail price $9.99 - $89.99, trade at ~80%, purchase at ~55%
    let b2c_price_cents = 999 + ((seed * 37) % 8000) as i64;
    let b2b_price_cents = b2c_price_cents * 80 / 100;
    let purchase_price_cents = b2c_price_cents * 55 / 100;

    let tax_rate_bps = TAX_RATES[seed % TAX_RATES.len()];

    // Random stock (0-50): some variants start out of stock
    let quantity = (seed % 51) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        branch_id: branch_id.to_string(),
        user_id: "seed".to_string(),
        barcode,
        name: style.to_string(),
        item_code: Some(format!("MRD-{:05}", seed)),
        color: color.to_string(),
        size: size.to_string(),
        quantity,
        b2b_price_cents,
        b2c_price_cents,
        purchase_price_cents,
        tax_rate_bps,
        status: ProductStatus::for_quantity(quantity),
        created_at: now,
        updated_at: now,
    }
}

/// Generates a sample customer.
fn generate_customer(branch_id: &str, name: &str, tier: CustomerType) -> Customer {
    let now = Utc::now();
    let slug: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    Customer {
        id: Uuid::new_v4().to_string(),
        branch_id: branch_id.to_string(),
        customer_type: tier,
        name: name.to_string(),
        email: Some(format!("{}@example.com", slug)),
        phone: None,
        created_at: now,
        updated_at: now,
    }
}
