//! Purchase and subscription status.
//!
//! Run with:
//! ```bash
//! cargo run --example status -- [product-id]
//! ```
//!
//! Reads the same `INAPPPAY_*` variables as the checkout demo.

use inapppay_rs::dialog::ChannelPresenter;
use inapppay_rs::{InAppPay, InAppPayConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = InAppPayConfig::from_env()?;
    // Status checks never present a dialog.
    let (presenter, _dialogs) = ChannelPresenter::new(1);
    let sdk = InAppPay::connect(config, presenter)?;

    println!("📋 InAppPay status for {} ({})", sdk.user_id(), sdk.user_country());

    if let Some(product_id) = std::env::args().nth(1) {
        match sdk.is_user_purchased(&product_id).await {
            Ok(status) => println!("   Purchased {}: {}", product_id, status.active),
            Err(e) => println!("   Purchase check failed: {} ({})", e, e.code()),
        }
        match sdk.is_user_subscribed(&product_id).await {
            Ok(status) => println!("   Subscribed {}: {}", product_id, status.active),
            Err(e) => println!("   Subscription check failed: {} ({})", e, e.code()),
        }
    }

    println!("\nPurchases:");
    match sdk.get_user_purchases().await {
        Ok(listing) => println!("{}", serde_json::to_string_pretty(&listing)?),
        Err(e) => println!("   {} ({})", e, e.code()),
    }

    println!("\nSubscriptions:");
    match sdk.get_user_subscriptions().await {
        Ok(listing) => println!("{}", serde_json::to_string_pretty(&listing)?),
        Err(e) => println!("   {} ({})", e, e.code()),
    }

    Ok(())
}
