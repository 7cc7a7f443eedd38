//! Backend gateway.
//!
//! [`Gateway`] is the set of operations the SDK performs against the backend.
//! [`HttpGateway`] implements it with one JSON POST per call and interprets
//! the shared response envelope into typed results:
//!
//! 1. No HTTP response at all: [`InAppPayError::Network`].
//! 2. Non-2xx status: [`InAppPayError::ServerError`] built from the error body.
//! 3. `success` not `true`: the operation's own failure variant.
//! 4. `success: true`: the operation's nested fields, or
//!    [`InAppPayError::ParseFailed`] when a required one is missing.

use crate::config::InAppPayConfig;
use crate::errors::{InAppPayError, Result};
use crate::types::{
    ApiEnvelope, ItemData, ItemRequest, ListRequest, PurchaseReceipt, PurchaseRequest,
    StatusCheck, ValidatedItem,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

/// Message used when `processPurchase` succeeds without one.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Purchase completed successfully";

/// Backend endpoints, one per gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `validateItemForPurchase`
    ValidateItem,
    /// `processPurchase`
    ProcessPurchase,
    /// `checkUserPurchased`
    CheckUserPurchased,
    /// `checkUserSubscribed`
    CheckUserSubscribed,
    /// `getPurchases`
    GetPurchases,
    /// `getSubscriptions`
    GetSubscriptions,
}

impl Endpoint {
    /// Path of the endpoint relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ValidateItem => "validateItemForPurchase",
            Endpoint::ProcessPurchase => "processPurchase",
            Endpoint::CheckUserPurchased => "checkUserPurchased",
            Endpoint::CheckUserSubscribed => "checkUserSubscribed",
            Endpoint::GetPurchases => "getPurchases",
            Endpoint::GetSubscriptions => "getSubscriptions",
        }
    }

    /// Builds the error for a response whose `success` flag is not `true`.
    fn rejection(&self, envelope: &ApiEnvelope) -> InAppPayError {
        let (fallback_message, fallback_code) = match self {
            Endpoint::ValidateItem => ("Item validation failed", "VALIDATION_FAILED"),
            Endpoint::ProcessPurchase => ("Purchase failed", "PURCHASE_FAILED"),
            Endpoint::CheckUserPurchased => ("Failed to check purchase status", "CHECK_FAILED"),
            Endpoint::CheckUserSubscribed => {
                ("Failed to check subscription status", "CHECK_FAILED")
            }
            Endpoint::GetPurchases => ("Failed to get purchases", "GET_PURCHASES_FAILED"),
            Endpoint::GetSubscriptions => {
                ("Failed to get subscriptions", "GET_SUBSCRIPTIONS_FAILED")
            }
        };
        let message = envelope
            .error_text()
            .unwrap_or(fallback_message)
            .to_string();
        let code = envelope
            .error_code
            .clone()
            .unwrap_or_else(|| fallback_code.to_string());
        warn!(endpoint = self.path(), %code, %message, "backend rejected request");

        match self {
            Endpoint::ValidateItem => InAppPayError::ValidationFailed { message, code },
            Endpoint::ProcessPurchase => InAppPayError::PurchaseFailed { message, code },
            _ => InAppPayError::CheckFailed { message, code },
        }
    }
}

/// Operations the SDK performs against the backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Checks that an item exists and may be bought by this user.
    async fn validate_item(&self, request: &ItemRequest) -> Result<ValidatedItem>;

    /// Submits payment details for a validated item.
    async fn process_purchase(&self, request: &PurchaseRequest) -> Result<PurchaseReceipt>;

    /// Whether the user owns the item.
    async fn check_user_purchased(&self, request: &ItemRequest) -> Result<StatusCheck>;

    /// Whether the user holds an active subscription to the item.
    async fn check_user_subscribed(&self, request: &ItemRequest) -> Result<StatusCheck>;

    /// Lists the user's purchases; the payload shape is backend-defined.
    async fn get_purchases(&self, request: &ListRequest) -> Result<Value>;

    /// Lists the user's subscriptions; the payload shape is backend-defined.
    async fn get_subscriptions(&self, request: &ListRequest) -> Result<Value>;
}

/// [`Gateway`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Creates a gateway with the configured endpoint and timeouts.
    ///
    /// Timeouts apply per phase: connecting, and each read. A response that
    /// keeps arriving is never cut off.
    ///
    /// # Examples
    ///
    /// ```
    /// use inapppay_rs::client::HttpGateway;
    /// use inapppay_rs::config::InAppPayConfig;
    ///
    /// let gateway = HttpGateway::new(&InAppPayConfig::new("demo")).unwrap();
    /// assert!(gateway.base_url().as_str().ends_with('/'));
    /// ```
    pub fn new(config: &InAppPayConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.request_timeout)
            .build()
            .map_err(|e| InAppPayError::Config(format!("cannot build HTTP client: {}", e)))?;
        Self::with_client(&config.base_url, client)
    }

    /// Creates a gateway around an existing HTTP client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of an endpoint.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    async fn post<B: Serialize + Sync>(&self, endpoint: Endpoint, body: &B) -> Result<ApiEnvelope> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "sending request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(endpoint = endpoint.path(), status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(error_from_body(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(endpoint = endpoint.path(), error = %e, "malformed response body");
            InAppPayError::ParseFailed(format!("{}: {}", endpoint.path(), e))
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn validate_item(&self, request: &ItemRequest) -> Result<ValidatedItem> {
        let envelope = self.post(Endpoint::ValidateItem, request).await?;
        parse_validated_item(envelope)
    }

    // Card data must stay out of the span.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, method = %request.payment_method))]
    async fn process_purchase(&self, request: &PurchaseRequest) -> Result<PurchaseReceipt> {
        let envelope = self.post(Endpoint::ProcessPurchase, request).await?;
        parse_receipt(envelope)
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn check_user_purchased(&self, request: &ItemRequest) -> Result<StatusCheck> {
        let envelope = self.post(Endpoint::CheckUserPurchased, request).await?;
        parse_status(Endpoint::CheckUserPurchased, envelope)
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn check_user_subscribed(&self, request: &ItemRequest) -> Result<StatusCheck> {
        let envelope = self.post(Endpoint::CheckUserSubscribed, request).await?;
        parse_status(Endpoint::CheckUserSubscribed, envelope)
    }

    #[instrument(skip(self, request))]
    async fn get_purchases(&self, request: &ListRequest) -> Result<Value> {
        let envelope = self.post(Endpoint::GetPurchases, request).await?;
        parse_listing(Endpoint::GetPurchases, envelope)
    }

    #[instrument(skip(self, request))]
    async fn get_subscriptions(&self, request: &ListRequest) -> Result<Value> {
        let envelope = self.post(Endpoint::GetSubscriptions, request).await?;
        parse_listing(Endpoint::GetSubscriptions, envelope)
    }
}

/// Builds the error for a non-2xx response.
fn error_from_body(status: StatusCode, body: &[u8]) -> InAppPayError {
    warn!(status = status.as_u16(), "backend returned error status");

    if body.iter().all(u8::is_ascii_whitespace) {
        return InAppPayError::ServerError {
            message: "Unknown server error".to_string(),
            code: "UNKNOWN_ERROR".to_string(),
        };
    }
    match serde_json::from_slice::<ApiEnvelope>(body) {
        Ok(envelope) => InAppPayError::ServerError {
            message: envelope
                .error_text()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Server error (HTTP {})", status.as_u16())),
            code: envelope
                .error_code
                .unwrap_or_else(|| "SERVER_ERROR".to_string()),
        },
        Err(e) => InAppPayError::ParseFailed(format!(
            "unreadable error body for HTTP {}: {}",
            status.as_u16(),
            e
        )),
    }
}

fn missing(endpoint: Endpoint, field: &str) -> InAppPayError {
    warn!(endpoint = endpoint.path(), field, "required response field missing");
    InAppPayError::ParseFailed(format!("{}: missing or invalid `{}`", endpoint.path(), field))
}

/// Reads an optional object field; `null` counts as absent.
fn optional_object(
    endpoint: Endpoint,
    value: Option<Value>,
    field: &str,
) -> Result<Option<Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(missing(endpoint, field)),
    }
}

pub(crate) fn parse_validated_item(envelope: ApiEnvelope) -> Result<ValidatedItem> {
    let endpoint = Endpoint::ValidateItem;
    if !envelope.is_success() {
        return Err(endpoint.rejection(&envelope));
    }
    let data = envelope
        .data
        .and_then(ItemData::from_value)
        .ok_or_else(|| missing(endpoint, "data"))?;
    let item_type = data
        .item_type()
        .ok_or_else(|| missing(endpoint, "data.type"))?
        .to_string();
    Ok(ValidatedItem { item_type, data })
}

pub(crate) fn parse_receipt(envelope: ApiEnvelope) -> Result<PurchaseReceipt> {
    let endpoint = Endpoint::ProcessPurchase;
    if !envelope.is_success() {
        return Err(endpoint.rejection(&envelope));
    }
    Ok(PurchaseReceipt {
        message: envelope
            .message
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
        data: optional_object(endpoint, envelope.data, "data")?,
    })
}

pub(crate) fn parse_status(endpoint: Endpoint, envelope: ApiEnvelope) -> Result<StatusCheck> {
    if !envelope.is_success() {
        return Err(endpoint.rejection(&envelope));
    }
    let (flag, details) = match endpoint {
        Endpoint::CheckUserSubscribed => ("subscribed", "subscriptionData"),
        _ => ("purchased", "purchaseData"),
    };
    let mut data = match envelope.data {
        Some(Value::Object(map)) => map,
        _ => return Err(missing(endpoint, "data")),
    };
    let active = data
        .get(flag)
        .and_then(Value::as_bool)
        .ok_or_else(|| missing(endpoint, flag))?;
    Ok(StatusCheck {
        active,
        details: optional_object(endpoint, data.remove(details), details)?,
    })
}

pub(crate) fn parse_listing(endpoint: Endpoint, envelope: ApiEnvelope) -> Result<Value> {
    if !envelope.is_success() {
        return Err(endpoint.rejection(&envelope));
    }
    envelope.data.ok_or_else(|| missing(endpoint, "data"))
}
