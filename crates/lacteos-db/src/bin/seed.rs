//! # Seed Data Generator
//!
//! Populates the database with a dairy catalog and mock sales for
//! development and demos.
//!
//! ## Usage
//! ```bash
//! # Catalog (if empty) + 20 mock sales
//! cargo run -p lacteos-db --bin seed
//!
//! # More sales, custom database, and an admin login
//! cargo run -p lacteos-db --bin seed -- --sales 200 --db ./data/lacteos.db --admin admin:cambiame123
//! ```
//!
//! ## Mock Sales
//! Each sale:
//! - is dated at a random moment within the last 30 days
//! - has a random customer, or none (walk-in) one time in five
//! - holds 1-5 distinct products, 1-10 units each
//! - books cost at 60% of price for products without a cost
//! - is attributed to the `system` user, created on first run
//!
//! Mock sales are bookkeeping only; stock is not decremented.

use chrono::{Duration, Utc};
use lacteos_core::pricing::effective_unit_cost;
use lacteos_core::{ProductInput, Role};
use lacteos_db::password::hash_password;
use lacteos_db::{Database, DbConfig, NewSale, NewUser};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use std::env;

const SYSTEM_USERNAME: &str = "system";

/// (name, category, unit, price cents, cost cents, stock)
const CATALOG: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("Leche Entera", "Leches", "litro", 2550, 1800, 120),
    ("Leche Descremada", "Leches", "litro", 2650, 1900, 80),
    ("Leche Deslactosada", "Leches", "litro", 2900, 2100, 60),
    ("Leche Chocolatada", "Leches", "litro", 3200, 0, 45),
    ("Queso Fresco", "Quesos", "kg", 9000, 6000, 25),
    ("Queso Mozzarella", "Quesos", "kg", 11500, 8200, 18),
    ("Queso Parmesano", "Quesos", "kg", 18900, 13000, 8),
    ("Queso Crema", "Quesos", "unidad", 4200, 0, 30),
    ("Yogur Natural", "Yogures", "unidad", 1200, 700, 90),
    ("Yogur Griego", "Yogures", "unidad", 1800, 1100, 40),
    ("Yogur de Fresa", "Yogures", "unidad", 1300, 750, 6),
    ("Kéfir", "Yogures", "litro", 3500, 2200, 12),
    ("Mantequilla", "Mantequillas", "unidad", 3800, 2600, 35),
    ("Mantequilla sin Sal", "Mantequillas", "unidad", 3900, 0, 4),
    ("Crema de Leche", "Cremas", "litro", 4500, 3000, 20),
    ("Crema Agria", "Cremas", "unidad", 2700, 1700, 15),
    ("Dulce de Leche", "Postres", "unidad", 3300, 2000, 22),
    ("Arequipe", "Postres", "unidad", 3100, 0, 9),
];

const CUSTOMER_NAMES: &[&str] = &[
    "Juan Pérez",
    "María García",
    "Carlos López",
    "Ana Martínez",
    "Luis Rodríguez",
    "Carmen Sánchez",
    "Pedro Fernández",
    "Laura Gómez",
    "Miguel Torres",
    "Sofía Ramírez",
    "Diego Morales",
    "Elena Ruiz",
    "Roberto Díaz",
    "Isabel Jiménez",
    "Francisco Moreno",
    "Cliente Frecuente",
    "Pedido Corporativo",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales: usize = 20;
    let mut db_path = String::from("./lacteos_dev.db");
    let mut admin: Option<(String, String)> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin" | "-a" => {
                if i + 1 < args.len() {
                    match args[i + 1].split_once(':') {
                        Some((user, pass)) => admin = Some((user.to_string(), pass.to_string())),
                        None => {
                            eprintln!("--admin expects USER:PASSWORD");
                            return Ok(());
                        }
                    }
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lacteos Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>              Number of mock sales (default: 20)");
                println!("  -d, --db <PATH>              Database file path (default: ./lacteos_dev.db)");
                println!("  -a, --admin <USER:PASSWORD>  Also create a superuser admin");
                println!("  -h, --help                   Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lacteos Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    seed_catalog(&db).await?;

    if let Some((username, password)) = admin {
        seed_admin(&db, &username, &password).await?;
    }

    seed_sales(&db, sales).await?;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn seed_catalog(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Catalog already has {} products, leaving it as is", existing);
        return Ok(());
    }

    let today = Utc::now().date_naive();
    for (idx, (name, category, unit, price, cost, stock)) in CATALOG.iter().enumerate() {
        let input = ProductInput {
            name: name.to_string(),
            category: category.to_string(),
            description: format!("{} de producción local", name),
            price_cents: *price,
            cost_cents: *cost,
            stock: *stock,
            unit: unit.to_string(),
            // Fresh products get a shelf life; the rest keep none
            expiration_date: (idx % 3 == 0).then(|| today + Duration::days(10 + idx as i64)),
        };

        if let Err(e) = db.products().create(&input).await {
            eprintln!("Failed to insert {}: {}", name, e);
        }
    }

    println!("✓ Inserted {} products", db.products().count().await?);
    Ok(())
}

async fn seed_admin(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if db.users().get_by_username(username).await?.is_some() {
        println!("⚠ User '{}' already exists", username);
        return Ok(());
    }

    db.users()
        .create(&NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            is_staff: true,
            is_superuser: true,
            role: Role::Admin,
            ..NewUser::default()
        })
        .await?;

    println!("✓ Created admin '{}'", username);
    Ok(())
}

async fn seed_sales(db: &Database, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let system = match db.users().get_by_username(SYSTEM_USERNAME).await? {
        Some(user) => user.id,
        None => {
            // Nobody is meant to log in as `system`
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            let account = db
                .users()
                .create(&NewUser {
                    username: SYSTEM_USERNAME.to_string(),
                    email: "system@example.com".to_string(),
                    password_hash: hash_password(&secret)?,
                    ..NewUser::default()
                })
                .await?;
            println!("✓ Created system user");
            account.user.id
        }
    };

    // Mock sales leave stock untouched, so sold-out products qualify too
    let products = db.products().list_all().await?;
    if products.is_empty() {
        eprintln!("No products found; add some before generating sales.");
        return Ok(());
    }

    println!();
    println!("Generating sales...");

    let start = std::time::Instant::now();
    let mut items_created = 0usize;

    for n in 0..count {
        // Draw everything up front; the generator is not held across awaits
        let (sale_date, customer_name, lines) = {
            let mut rng = rand::thread_rng();

            let ago = Duration::days(rng.gen_range(0..=30))
                + Duration::hours(rng.gen_range(0..=23))
                + Duration::minutes(rng.gen_range(0..=59));

            let customer_name = if rng.gen_bool(0.2) {
                String::new()
            } else {
                CUSTOMER_NAMES
                    .choose(&mut rng)
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            };

            let wanted = rng.gen_range(1..=5).min(products.len());
            let picked: Vec<_> = products.choose_multiple(&mut rng, wanted).cloned().collect();
            let lines: Vec<_> = picked
                .into_iter()
                .map(|p| (p, rng.gen_range(1..=10i64)))
                .collect();

            (Utc::now() - ago, customer_name, lines)
        };

        let sale = db
            .sales()
            .create(&NewSale {
                sale_date,
                customer_name,
                notes: format!("Venta de prueba #{}", n + 1),
                created_by: Some(system.clone()),
            })
            .await?;

        for (product, quantity) in lines {
            let unit_cost = effective_unit_cost(product.price(), product.cost());
            db.sales()
                .add_item(&sale.id, &product.id, quantity, product.price(), unit_cost)
                .await?;
            items_created += 1;
        }
    }

    println!(
        "✓ Created {} sales with {} items in {:?}",
        count,
        items_created,
        start.elapsed()
    );
    Ok(())
}
