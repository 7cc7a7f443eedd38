//! # inapppay-rs
//!
//! A headless client SDK for the InAppPay in-app purchase backend.
//!
//! The SDK validates an item with the backend, walks the user through a
//! checkout dialog (payment method, card or PayPal details), submits the
//! payment and reports a single typed outcome. It also answers status
//! queries: whether a user owns an item or holds a subscription, and the
//! user's purchase and subscription listings.
//!
//! ## Features
//!
//! - **Purchase flow**: validate → checkout dialog → payment, cancellable at any point
//! - **Status checks**: ownership, subscription, and listings without any dialog
//! - **Headless dialog**: a state machine the host UI drives through [`dialog::DialogPresenter`]
//! - **Field validation**: composable rules with Luhn, expiry and e-mail presets
//! - **Pluggable transport**: [`client::Gateway`] with an HTTP implementation over reqwest
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inapppay_rs::config::InAppPayConfig;
//! use inapppay_rs::dialog::ChannelPresenter;
//! use inapppay_rs::sdk::InAppPay;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (presenter, mut dialogs) = ChannelPresenter::new(1);
//! let sdk = InAppPay::connect(InAppPayConfig::new("my-project"), presenter)?;
//!
//! // The host UI drives each dialog and reports back.
//! tokio::spawn(async move {
//!     while let Some(mut request) = dialogs.recv().await {
//!         let _ = request.dialog.close();
//!         request.finish();
//!     }
//! });
//!
//! match sdk.buy("premium").await {
//!     Ok(receipt) => println!("{}", receipt.message),
//!     Err(e) => println!("{} ({})", e, e.code()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Purchase Flow
//!
//! 1. **Identity check**: device id and project name must be known
//! 2. **Validation**: `validateItemForPurchase` returns the item type and metadata
//! 3. **Checkout dialog**: presented according to the item type
//! 4. **Payment**: `processPurchase` with card or PayPal data
//! 5. **Outcome**: a receipt, or an error carrying a message and a code
//!
//! Every outcome clears the purchase context of that attempt.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod context;
pub mod device;
pub mod dialog;
pub mod errors;
pub mod sdk;
pub mod types;
pub mod utils;
pub mod validators;

// Re-export commonly used items
pub use client::{Gateway, HttpGateway};
pub use config::InAppPayConfig;
pub use errors::{InAppPayError, Result};
pub use sdk::{CancelHandle, InAppPay, PurchaseCallback, PurchaseSession};
pub use types::{ItemType, PaymentMethod, PurchaseReceipt, StatusCheck};
