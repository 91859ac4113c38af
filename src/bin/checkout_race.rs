//! Checkout race tool
//!
//! Seeds one product and fires concurrent checkouts against it, then reports
//! how many succeeded and what stock is left.
//!
//! Run with: cargo run --bin checkout_race --release -- --buyers 50 --stock 10 --quantity 1

use std::sync::Arc;
use std::time::Instant;

use storefront_checkout::domain::NewProduct;
use storefront_checkout::store::{PgInventoryStore, ProductRepository};
use storefront_checkout::{db, CheckoutCommand, CheckoutError, CheckoutHandler};

fn arg(args: &[String], name: &str, default: i64) -> i64 {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let buyers = arg(&args, "--buyers", 50);
    let stock = arg(&args, "--stock", 10);
    let quantity = arg(&args, "--quantity", 1);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Checkout race - {} buyers, stock {}, quantity {}", buyers, stock, quantity);
    println!("Connecting to database...");

    let pool = db::connect(&database_url, 20).await?;
    if !db::check_schema(&pool).await? {
        anyhow::bail!("Database schema incomplete");
    }

    let products = PgInventoryStore::new(pool.clone());
    let product = products
        .create(&NewProduct {
            name: format!("race-{}", chrono::Utc::now().timestamp_millis()),
            price: 1000,
            stock,
            active: true,
            category_id: None,
        })
        .await?;

    let handler = Arc::new(CheckoutHandler::postgres(pool.clone()));
    let start = Instant::now();

    let tasks: Vec<_> = (0..buyers)
        .map(|_| {
            let handler = Arc::clone(&handler);
            let product_id = product.id;
            tokio::spawn(async move {
                handler
                    .execute(CheckoutCommand::new(Vec::new()).with_item(product_id, quantity))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0u64;
    let mut rejected = 0u64;
    let mut failed = 0u64;
    for task in tasks {
        match task.await? {
            Ok(_) => succeeded += 1,
            Err(CheckoutError::InsufficientStock { .. }) => rejected += 1,
            Err(e) => {
                eprintln!("Checkout failed: {}", e);
                failed += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    let remaining = products
        .find_by_id(product.id)
        .await?
        .map(|p| p.stock)
        .unwrap_or_default();

    println!("\n=== Checkout Race Results ===");
    println!("Product: {}", product.id);
    println!("Succeeded: {}", succeeded);
    println!("Rejected (insufficient stock): {}", rejected);
    println!("Failed: {}", failed);
    println!("Remaining stock: {}", remaining);
    println!("Time: {:.2}s", elapsed.as_secs_f64());

    let sold = succeeded as i64 * quantity;
    if sold + remaining != stock || remaining < 0 {
        anyhow::bail!("Inventory mismatch: sold {} + remaining {} != {}", sold, remaining, stock);
    }
    println!("Inventory consistent: sold {} + remaining {} = {}", sold, remaining, stock);

    pool.close().await;
    Ok(())
}
