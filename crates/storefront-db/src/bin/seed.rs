//! # Seed Data Generator
//!
//! Populates a development database with catalog products, tier prices,
//! variants, guest customers and the standard permissions.
//!
//! ## Usage
//! ```bash
//! # 2,000 products and 500 guests (default)
//! cargo run -p storefront-db --bin seed
//!
//! cargo run -p storefront-db --bin seed -- --count 10000 --guests 2000
//! cargo run -p storefront-db --bin seed -- --db ./data/store.db
//! ```
//!
//! ## Generated Products
//! - SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Price: 4.99 - 124.99 plus a size surcharge
//! - Every third product gets quantity tier prices (5+, 10+)
//! - Every fifth product gets two child variants

use chrono::Utc;
use std::env;
use storefront_core::Product;
use storefront_db::{Database, DbConfig, StandardPermissionProvider};

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "APP",
        &[
            "Cotton T-Shirt",
            "Hooded Sweatshirt",
            "Denim Jacket",
            "Rain Coat",
            "Chino Trousers",
            "Wool Socks",
            "Baseball Cap",
            "Leather Belt",
        ],
    ),
    (
        "ELE",
        &[
            "USB-C Cable",
            "Wireless Mouse",
            "Mechanical Keyboard",
            "Noise Cancelling Headphones",
            "Portable Speaker",
            "Power Bank",
            "Webcam",
            "Monitor Stand",
        ],
    ),
    (
        "HOM",
        &[
            "Ceramic Mug",
            "Cast Iron Pan",
            "Chef Knife",
            "Cutting Board",
            "Table Lamp",
            "Throw Pillow",
            "Bath Towel",
            "Storage Box",
        ],
    ),
    (
        "GRD",
        &[
            "Garden Hose",
            "Pruning Shears",
            "Watering Can",
            "Flower Pot",
            "Seed Starter Kit",
            "Work Gloves",
        ],
    ),
];

/// Size variants with their price surcharge in cents
const SIZES: &[(&str, i64)] = &[
    ("S", 0),
    ("M", 200),
    ("L", 400),
    ("XL", 600),
    ("Compact", 0),
    ("Standard", 500),
    ("Pro", 1500),
];

/// Tax rates in basis points
const TAX_RATES: &[i64] = &[0, 700, 1900];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 2000;
    let mut guests: usize = 500;
    let mut db_path = String::from("./storefront_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(2000);
                    i += 1;
                }
            }
            "--guests" | "-g" => {
                if i + 1 < args.len() {
                    guests = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 2000)");
                println!("  -g, --guests <N>   Number of guest customers (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!("Guests:   {}", guests);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let report = db
        .permissions()
        .install_permissions(&[&StandardPermissionProvider], false)
        .await?;
    println!("✓ Permissions installed ({} added)", report.added.len());

    let existing = db.products().count_exportable().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let products = db.products();
    let mut generated = 0;
    let mut tier_prices = 0;
    let mut variants = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, product_name) in names.iter().enumerate() {
            for (size_idx, (size_name, surcharge)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                let product = generate_product(category_code, product_name, size_name, *surcharge, seed);

                let inserted = match products.insert(&product).await {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("Failed to insert {}: {}", product.sku, e);
                        continue;
                    }
                };
                generated += 1;

                if seed % 3 == 0 {
                    products
                        .insert_tier_price(inserted.id, 5, inserted.price_cents * 95 / 100)
                        .await?;
                    products
                        .insert_tier_price(inserted.id, 10, inserted.price_cents * 90 / 100)
                        .await?;
                    tier_prices += 2;
                }

                if seed % 5 == 0 {
                    for (variant_idx, color) in ["Black", "White"].iter().enumerate() {
                        let mut child = generate_product(
                            category_code,
                            product_name,
                            size_name,
                            *surcharge - 100 * (variant_idx as i64 + 1),
                            seed,
                        );
                        child.sku = format!("{}-{}", inserted.sku, color.to_uppercase());
                        child.name = format!("{} ({})", inserted.name, color);
                        child.parent_product_id = Some(inserted.id);
                        products.insert(&child).await?;
                        variants += 1;
                    }
                }

                if generated % 500 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products, {} tier prices, {} variants in {:?}",
        generated, tier_prices, variants, elapsed
    );

    println!();
    println!("Generating guests...");
    let customers = db.customers();
    for n in 0..guests {
        let ident = format!("192.168.{}.{}-seed", n / 250, n % 250);
        customers.create_guest(None, Some(&ident)).await?;
    }
    println!("✓ Generated {} guests", customers.count_guests().await?);

    println!();
    println!("✓ Seed complete! {} exportable products", products.count_exportable().await?);

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(category: &str, name: &str, size: &str, surcharge: i64, seed: usize) -> Product {
    let now = Utc::now();

    let code: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", category, code, seed);

    // 4.99 - 124.99
    let base_price = 499 + ((seed * 37) % 12_000) as i64;

    Product {
        id: 0,
        sku,
        name: format!("{} {}", name, size),
        short_description: Some(format!("{} in size {}", name, size)),
        price_cents: (base_price + surcharge).max(99),
        tax_rate_bps: TAX_RATES[seed % TAX_RATES.len()],
        parent_product_id: None,
        published: true,
        deleted: false,
        created_at: now,
        updated_at: now,
    }
}
