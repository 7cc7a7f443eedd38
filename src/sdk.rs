//! Public entry point of the SDK.
//!
//! [`InAppPay`] checks the caller's identity, then either runs a
//! [`PurchaseSession`] (validate → checkout dialog → payment) or forwards a
//! status check straight to the gateway.
//!
//! Each purchase attempt owns its [`PurchaseContext`]; the context is cleared
//! on every terminal outcome. A [`CancelHandle`] ends the attempt during
//! validation or while the dialog is open; once the user submitted payment
//! details the payment call always runs to completion.

use crate::client::{Gateway, HttpGateway};
use crate::config::InAppPayConfig;
use crate::context::PurchaseContext;
use crate::device::{detect_country, DeviceProbe, HostProbe};
use crate::dialog::{CheckoutDialog, DialogOutcome, DialogPresenter, PaymentDetails};
use crate::errors::{InAppPayError, Result};
use crate::types::{
    CardData, ItemRequest, ItemType, ListRequest, PaypalData, PurchaseReceipt, PurchaseRequest,
    StatusCheck,
};
use crate::utils::detect_card_brand;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Receives the outcome of a purchase as a `(message, code)` pair on failure.
pub trait PurchaseCallback: Send + Sync {
    /// Called with the receipt message and optional transaction data.
    fn on_success(&self, message: &str, data: Option<&Map<String, Value>>);

    /// Called with the failure message and its error code.
    fn on_error(&self, message: &str, code: &str);
}

/// In-app purchase SDK.
///
/// # Examples
///
/// ```no_run
/// use inapppay_rs::config::InAppPayConfig;
/// use inapppay_rs::dialog::ChannelPresenter;
/// use inapppay_rs::sdk::InAppPay;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (presenter, _dialogs) = ChannelPresenter::new(1);
/// let sdk = InAppPay::connect(InAppPayConfig::new("my-project"), presenter)?;
///
/// let status = sdk.is_user_purchased("premium").await?;
/// println!("owned: {}", status.active);
/// # Ok(())
/// # }
/// ```
pub struct InAppPay<G, P> {
    config: InAppPayConfig,
    gateway: Arc<G>,
    presenter: Arc<P>,
    user_id: String,
    user_country: String,
}

impl<P: DialogPresenter> InAppPay<HttpGateway, P> {
    /// Creates an SDK talking HTTP to the configured backend, identified by the host device.
    pub fn connect(config: InAppPayConfig, presenter: P) -> Result<Self> {
        let gateway = HttpGateway::new(&config)?;
        Ok(Self::new(config, gateway, presenter, &HostProbe))
    }
}

impl<G: Gateway, P: DialogPresenter> InAppPay<G, P> {
    /// Creates an SDK from its parts.
    ///
    /// The user id comes from the configuration override, else from `probe`.
    pub fn new(config: InAppPayConfig, gateway: G, presenter: P, probe: &dyn DeviceProbe) -> Self {
        let user_id = config
            .user_id_override
            .clone()
            .or_else(|| probe.device_id())
            .unwrap_or_default();
        let user_country = detect_country(probe);
        debug!(project = %config.project_name, %user_country, "sdk initialised");

        Self {
            config,
            gateway: Arc::new(gateway),
            presenter: Arc::new(presenter),
            user_id,
            user_country,
        }
    }

    /// Id sent as `userId` with every request.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Upper-case ISO country detected at construction.
    pub fn user_country(&self) -> &str {
        &self.user_country
    }

    /// Project sent as `projectName` with every request.
    pub fn project_name(&self) -> &str {
        &self.config.project_name
    }

    /// Configuration the SDK was built with.
    pub fn config(&self) -> &InAppPayConfig {
        &self.config
    }

    fn ensure_identity(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(InAppPayError::MissingDeviceId);
        }
        if self.config.project_name.trim().is_empty() {
            return Err(InAppPayError::MissingProjectName);
        }
        Ok(())
    }

    fn item_request(&self, product_id: &str) -> ItemRequest {
        ItemRequest {
            project_name: self.config.project_name.clone(),
            product_id: product_id.to_string(),
            user_id: self.user_id.clone(),
        }
    }

    fn list_request(&self) -> ListRequest {
        ListRequest {
            project_name: self.config.project_name.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Starts a purchase attempt without running it.
    ///
    /// Fails without any network call when the identity is incomplete.
    pub fn begin_purchase(&self, product_id: &str) -> Result<PurchaseSession<G, P>> {
        self.ensure_identity()?;

        let mut context = PurchaseContext::new();
        context.set_purchase_context(product_id);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        Ok(PurchaseSession {
            gateway: Arc::clone(&self.gateway),
            presenter: Arc::clone(&self.presenter),
            request: self.item_request(product_id),
            context,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            price_override: None,
            label_override: None,
            finished: false,
        })
    }

    /// Runs a complete purchase of `product_id`.
    pub async fn buy(&self, product_id: &str) -> Result<PurchaseReceipt> {
        self.begin_purchase(product_id)?.run().await
    }

    /// Runs a purchase and reports the outcome to `callback`.
    pub async fn buy_with(&self, product_id: &str, callback: &dyn PurchaseCallback) {
        match self.buy(product_id).await {
            Ok(receipt) => callback.on_success(&receipt.message, receipt.data.as_ref()),
            Err(err) => callback.on_error(&err.message(), err.code()),
        }
    }

    /// Whether the user already bought `product_id`.
    pub async fn is_user_purchased(&self, product_id: &str) -> Result<StatusCheck> {
        self.ensure_identity()?;
        self.gateway
            .check_user_purchased(&self.item_request(product_id))
            .await
    }

    /// Whether the user holds an active subscription to `product_id`.
    pub async fn is_user_subscribed(&self, product_id: &str) -> Result<StatusCheck> {
        self.ensure_identity()?;
        self.gateway
            .check_user_subscribed(&self.item_request(product_id))
            .await
    }

    /// Raw subscription listing of the user.
    pub async fn get_user_subscriptions(&self) -> Result<Value> {
        self.ensure_identity()?;
        self.gateway.get_subscriptions(&self.list_request()).await
    }

    /// Raw purchase listing of the user.
    pub async fn get_user_purchases(&self) -> Result<Value> {
        self.ensure_identity()?;
        self.gateway.get_purchases(&self.list_request()).await
    }
}

/// Cancels a running purchase session.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Ends the session with `USER_CANCELLED` if it has not reached payment yet.
    ///
    /// After the dialog was submitted this has no effect on the outcome.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

async fn until_cancelled(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// One purchase attempt.
///
/// Holds the purchase context from the moment the attempt starts until it ends.
pub struct PurchaseSession<G, P> {
    gateway: Arc<G>,
    presenter: Arc<P>,
    request: ItemRequest,
    context: PurchaseContext,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    price_override: Option<String>,
    label_override: Option<String>,
    finished: bool,
}

impl<G: Gateway, P: DialogPresenter> PurchaseSession<G, P> {
    /// Product being purchased.
    pub fn product_id(&self) -> &str {
        &self.request.product_id
    }

    /// Purchase context of this attempt; empty once it finished.
    pub fn context(&self) -> &PurchaseContext {
        &self.context
    }

    /// Whether the session reached a terminal outcome.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Shows `price` in the dialog instead of the price sent by the backend.
    pub fn with_amount(mut self, price: impl Into<String>) -> Self {
        self.price_override = Some(price.into());
        self
    }

    /// Shows `label` in front of the price instead of the backend's label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_override = Some(label.into());
        self
    }

    /// Handle that cancels this session from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Drives the attempt to a terminal outcome.
    ///
    /// A session runs once; running it again yields `INVALID_CONTEXT`.
    pub async fn run(&mut self) -> Result<PurchaseReceipt> {
        if self.finished {
            return Err(InAppPayError::InvalidContext);
        }

        let cancelled = until_cancelled(self.cancel_rx.clone());
        let checkout = tokio::select! {
            biased;
            _ = cancelled => Err(InAppPayError::UserCancelled),
            request = self.checkout() => request,
        };
        // The payment may already be charged once sent, so it is never raced against cancel.
        let result = match checkout {
            Ok(request) => self.gateway.process_purchase(&request).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => info!(product_id = %self.request.product_id, "purchase completed"),
            Err(err) => info!(
                product_id = %self.request.product_id,
                code = err.code(),
                "purchase ended without payment"
            ),
        }
        self.finished = true;
        self.context.reset();
        result
    }

    /// Validation and dialog; yields the payment request once details are submitted.
    async fn checkout(&mut self) -> Result<PurchaseRequest> {
        let item = self.gateway.validate_item(&self.request).await?;
        let item_type: ItemType = item
            .item_type
            .parse()
            .map_err(InAppPayError::InvalidItemType)?;
        self.context.set_item_data(item.data, item_type);
        if let Some(price) = &self.price_override {
            self.context.set_price(price.clone());
        }
        if let Some(label) = &self.label_override {
            self.context.set_label(label.clone());
        }

        let dialog = CheckoutDialog::new(item_type.into(), &self.context);
        match self.presenter.present(dialog).await {
            DialogOutcome::Cancelled => Err(InAppPayError::UserCancelled),
            DialogOutcome::Submitted(details) => {
                build_purchase_request(&self.request, &self.context, details)
            }
        }
    }
}

/// Assembles the `processPurchase` body from a validated context.
pub fn build_purchase_request(
    identity: &ItemRequest,
    context: &PurchaseContext,
    details: PaymentDetails,
) -> Result<PurchaseRequest> {
    if !context.is_valid() {
        warn!("payment submitted without a complete purchase context");
        return Err(InAppPayError::InvalidContext);
    }
    let product_id = context
        .item_key()
        .ok_or(InAppPayError::InvalidContext)?
        .to_string();
    let payment_method = details.method();

    let (card_data, paypal_data) = match details {
        PaymentDetails::Card {
            number,
            expiry,
            cvv,
            name,
        } => {
            let card_type = detect_card_brand(&number);
            let card = CardData {
                card_number: number,
                expiry,
                cvv,
                name,
                card_type,
            };
            debug!(card = %card, "paying by card");
            (Some(card), None)
        }
        PaymentDetails::Paypal { email } => (None, Some(PaypalData { email: Some(email) })),
    };

    Ok(PurchaseRequest {
        project_name: identity.project_name.clone(),
        product_id,
        user_id: identity.user_id.clone(),
        payment_method,
        card_data,
        paypal_data,
    })
}
