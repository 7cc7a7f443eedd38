//! Console checkout.
//!
//! Buys a product against the configured backend, driving the checkout
//! dialog from the terminal.
//!
//! Run with:
//! ```bash
//! cargo run --example checkout -- <product-id>
//! ```
//!
//! Environment variables (a `.env` file is honoured):
//! - INAPPPAY_PROJECT_NAME: Project identifier (required)
//! - INAPPPAY_BASE_URL: Backend base URL
//! - INAPPPAY_TIMEOUT_SECS: Connect and per-read timeout in seconds
//! - INAPPPAY_USER_ID: User id to use instead of the machine id

use anyhow::Context;
use inapppay_rs::dialog::{CheckoutDialog, ChannelPresenter, DialogRequest, Field};
use inapppay_rs::utils::user_friendly_message;
use inapppay_rs::{InAppPay, InAppPayConfig, PaymentMethod};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    println!("{}:", label);
    Ok(input.next_line().await?)
}

/// Walks one dialog to a terminal step; end of input closes it.
async fn drive(dialog: &mut CheckoutDialog, input: &mut Input) -> anyhow::Result<()> {
    println!("\n=== {} ===", dialog.title());
    if let Some(name) = dialog.product_name() {
        println!("{}", name);
    }
    if let Some(description) = dialog.product_description() {
        println!("{}", description);
    }
    if let Some(amount) = dialog.amount_text() {
        println!("{}", amount);
    }

    let method = loop {
        match prompt(input, "Pay with [card/paypal], or 'q' to close").await? {
            Some(line) if line.trim() == "card" => break PaymentMethod::Card,
            Some(line) if line.trim() == "paypal" => break PaymentMethod::Paypal,
            Some(line) if line.trim() != "q" => continue,
            _ => {
                dialog.close()?;
                return Ok(());
            }
        }
    };
    dialog.select_method(method)?;
    println!("\n=== {} ===", dialog.title());

    loop {
        for field in dialog.visible_fields() {
            let Some(value) = prompt(input, field.label()).await? else {
                dialog.close()?;
                return Ok(());
            };
            dialog.set_field(*field, value)?;
            if let Some(error) = dialog.field_error(*field) {
                println!("  ! {}", error);
            }
        }
        match dialog.submit() {
            Ok(_) => return Ok(()),
            Err(e) => println!("{}; please re-enter the details", e),
        }
    }
}

async fn run_ui(mut request: DialogRequest, input: &mut Input) {
    if let Err(e) = drive(&mut request.dialog, input).await {
        eprintln!("dialog aborted: {}", e);
    }
    request.finish();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let product_id = std::env::args()
        .nth(1)
        .context("usage: checkout <product-id>")?;
    let config = InAppPayConfig::from_env()?;

    let (presenter, mut dialogs) = ChannelPresenter::new(1);
    let sdk = InAppPay::connect(config, presenter)?;

    println!("🛒 InAppPay checkout");
    println!("   Project: {}", sdk.project_name());
    println!("   User:    {}", sdk.user_id());
    println!("   Country: {}", sdk.user_country());

    tokio::spawn(async move {
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        while let Some(request) = dialogs.recv().await {
            run_ui(request, &mut input).await;
        }
    });

    match sdk.buy(&product_id).await {
        Ok(receipt) => {
            println!("\n✅ {}", receipt.message);
            if let Some(data) = receipt.data {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
        }
        Err(e) => {
            println!("\n❌ {}", user_friendly_message(&e.message(), e.code()));
            println!("   ({}: {})", e.code(), e);
        }
    }

    Ok(())
}
