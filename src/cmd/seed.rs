//! Demo data: `maker-copilot seed`.

use anyhow::{Context, Result};
use chrono::Datelike;
use maker_copilot::config::AppConfig;
use maker_copilot::db::{CopilotDb, NewPrice, NewSale, NewSaleLine};
use tracing::info;

const PRODUCTS: &[(&str, f64, f64, f64)] = &[
    // name, price, benefit, hours
    ("Tasse émaillée", 24.0, 14.0, 1.5),
    ("Vase grès", 58.0, 31.0, 3.0),
    ("Bol à thé", 32.0, 19.0, 2.0),
    ("Assiette plate", 28.0, 15.5, 1.75),
    ("Lampe céramique", 95.0, 48.0, 5.0),
];
const CHANNELS: &[&str] = &["Etsy", "Marché local", "Boutique", "Instagram"];
const CLIENTS: &[&str] = &["Alice Martin", "Bruno Petit", "Chloé Durand", "David Leroy"];
const URSAF_RATE: f64 = 0.123;
const MONTHLY_OBJECTIVE: i64 = 600;

/// Populate a demo account with a year of sales. Prints the new user id.
pub fn cmd_seed(config: &AppConfig, email: &str, year: Option<i32>) -> Result<()> {
    let year = year.unwrap_or_else(|| chrono::Utc::now().year());
    let db = CopilotDb::new(&config.database.path).context("Failed to open database")?;

    if db.find_user_id_by_email(email)?.is_some() {
        anyhow::bail!("User '{}' already exists; nothing to seed", email);
    }
    let user_id = db.create_user(email, "Demo", "Maker")?;
    db.set_objective(user_id, Some(MONTHLY_OBJECTIVE))?;

    let mut catalog = Vec::with_capacity(PRODUCTS.len());
    for &(name, price, benefit, time) in PRODUCTS {
        let product_id = db.create_product(user_id, name, "active", Some(price))?;
        let price_id = db.create_price(
            product_id,
            &NewPrice {
                name: "Standard".to_string(),
                price,
                benefit,
                ursaf: (price * URSAF_RATE * 100.0).round() / 100.0,
                expense: price - benefit - price * URSAF_RATE,
                commission: 0.0,
                time,
            },
        )?;
        catalog.push((product_id, price_id, price, benefit, time));
    }
    db.create_product(user_id, "Prototype théière", "draft", None)?;

    let channels = CHANNELS
        .iter()
        .map(|name| db.create_sales_channel(user_id, name))
        .collect::<Result<Vec<_>>>()?;
    let clients = CLIENTS
        .iter()
        .map(|name| db.create_client(user_id, name))
        .collect::<Result<Vec<_>>>()?;

    let mut sales = 0usize;
    for month in 1..=12u32 {
        for (slot, day) in [3u32, 12, 21].into_iter().enumerate() {
            let n = (month as usize) * 3 + slot;
            let (product_id, price_id, price, benefit, time) = catalog[n % catalog.len()];
            let quantity = 1 + (n % 2);
            let channel = channels[n % channels.len()];
            let client = clients[(n / 2) % clients.len()];
            let total = price * quantity as f64;
            let commission = if channel == channels[0] { total * 0.065 } else { 0.0 };

            let lines = vec![
                NewSaleLine {
                    product_id,
                    price_id: Some(price_id),
                    client_id: Some(client),
                };
                quantity
            ];
            db.create_sale(
                user_id,
                &NewSale {
                    name: format!("Vente {:02}/{:02}", day, month),
                    canal_id: Some(channel),
                    price: total,
                    benefit: benefit * quantity as f64 - commission,
                    nb_product: Some(quantity as f64),
                    ursaf: total * URSAF_RATE,
                    expense: total * 0.1,
                    commission,
                    time: time * quantity as f64,
                    created_at: Some(format!("{}-{:02}-{:02} 14:00:00", year, month, day)),
                },
                &lines,
            )?;
            sales += 1;
        }
    }

    info!(user_id, sales, year, "Seeded demo account");
    println!("Seeded demo user {} ({}) with {} sales in {}", user_id, email, sales, year);
    println!("Mint a token with: maker-copilot token --user-id {}", user_id);
    Ok(())
}
