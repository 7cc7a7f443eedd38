//! Core type definitions for the purchase flow.
//!
//! This module contains the wire shapes exchanged with the backend (requests
//! and the response envelope) and the typed results the gateway hands back
//! after interpreting a response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Currency assumed when an item carries none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Classification of a purchasable item.
///
/// Determines which checkout dialog is shown.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Non-repeating, single charge
    Onetime,
    /// Consumable that can be bought again
    Repurchase,
    /// Recurring subscription
    Subscription,
}

impl ItemType {
    /// Wire representation of the item type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Onetime => "onetime",
            ItemType::Repurchase => "repurchase",
            ItemType::Subscription => "subscription",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "onetime" => Ok(ItemType::Onetime),
            "repurchase" => Ok(ItemType::Repurchase),
            "subscription" => Ok(ItemType::Subscription),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment method chosen in the checkout dialog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Credit or debit card
    Card,
    /// PayPal account
    Paypal,
}

impl PaymentMethod {
    /// Wire representation of the payment method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card network guessed from the leading digit of a card number.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    /// Leading `4`
    Visa,
    /// Leading `5` or `2`
    Mastercard,
    /// Leading `3`
    Amex,
    /// Leading `6`
    Discover,
    /// Anything else
    Unknown,
}

impl CardBrand {
    /// Wire representation of the brand.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Discover => "discover",
            CardBrand::Unknown => "unknown",
        }
    }
}

/// Item metadata returned by `validateItemForPurchase`.
///
/// The object is kept verbatim; accessors read the keys the SDK knows about.
///
/// # Examples
///
/// ```
/// use inapppay_rs::types::ItemData;
/// use serde_json::json;
///
/// let item = ItemData::from_value(json!({"type": "onetime", "price": 4.99})).unwrap();
/// assert_eq!(item.item_type(), Some("onetime"));
/// assert_eq!(item.price().as_deref(), Some("4.99"));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ItemData(pub Map<String, Value>);

impl ItemData {
    /// Wraps a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Raw `type` string.
    pub fn item_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// Display name of the item.
    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    /// Display description of the item.
    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    /// Price normalized to a string.
    ///
    /// Reads `price`, falling back to `amount`; numbers and strings are both accepted.
    pub fn price(&self) -> Option<String> {
        ["price", "amount"]
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// ISO-4217 currency code, if the backend sent a non-empty one.
    pub fn currency(&self) -> Option<&str> {
        self.str_field("currency").filter(|c| !c.trim().is_empty())
    }

    /// Optional label shown in front of the price.
    pub fn label(&self) -> Option<&str> {
        self.str_field("label")
    }

    /// Looks up an arbitrary key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Card section of a purchase request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CardData {
    /// Card number as entered
    #[serde(rename = "cardNumber")]
    pub card_number: String,

    /// Expiry, `MM/YY`
    pub expiry: String,

    /// Security code
    pub cvv: String,

    /// Cardholder name
    pub name: String,

    /// Brand detected from the card number
    #[serde(rename = "cardType")]
    pub card_type: CardBrand,
}

impl fmt::Display for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tail: Vec<char> = self.card_number.trim().chars().rev().take(4).collect();
        tail.reverse();
        write!(
            f,
            "{} ending {}",
            self.card_type.as_str(),
            tail.into_iter().collect::<String>()
        )
    }
}

/// PayPal section of a purchase request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PaypalData {
    /// PayPal account e-mail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body sent to `processPurchase`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Project identifier
    pub project_name: String,

    /// Item key being bought
    pub product_id: String,

    /// Device or user id
    pub user_id: String,

    /// Method picked in the dialog
    pub payment_method: PaymentMethod,

    /// Present for card payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_data: Option<CardData>,

    /// Present for PayPal payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_data: Option<PaypalData>,
}

/// Body sent to the validation and status-check endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    /// Project identifier
    pub project_name: String,
    /// Item key
    pub product_id: String,
    /// Device or user id
    pub user_id: String,
}

/// Body sent to the listing endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    /// Project identifier
    pub project_name: String,
    /// Device or user id
    pub user_id: String,
}

/// Response envelope shared by every endpoint.
///
/// All fields are optional; the gateway decides what is required per operation.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ApiEnvelope {
    /// Outcome flag; anything but `true` is a failure
    #[serde(default)]
    pub success: Option<bool>,

    /// Operation payload
    #[serde(default)]
    pub data: Option<Value>,

    /// Success or failure text
    #[serde(default)]
    pub message: Option<String>,

    /// Failure text
    #[serde(default)]
    pub error: Option<String>,

    /// Machine-readable failure code
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

impl ApiEnvelope {
    /// `true` only when the backend explicitly reported success.
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }

    /// Error text, preferring `error` over `message`.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// An item the backend accepted for purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    /// Raw `type` string as sent by the backend
    pub item_type: String,

    /// Full item metadata
    pub data: ItemData,
}

/// Outcome of a successful `processPurchase` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    /// Backend message, or a default success text
    pub message: String,
    /// Transaction data, when the backend sent any
    pub data: Option<Map<String, Value>>,
}

/// Outcome of `checkUserPurchased` / `checkUserSubscribed`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusCheck {
    /// Whether the user owns the item or holds the subscription
    pub active: bool,

    /// `purchaseData` or `subscriptionData`, when present
    pub details: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_type_parsing() {
        assert_eq!("onetime".parse::<ItemType>(), Ok(ItemType::Onetime));
        assert_eq!("subscription".parse::<ItemType>(), Ok(ItemType::Subscription));
        assert_eq!("bundle".parse::<ItemType>(), Err("bundle".to_string()));
        assert_eq!(ItemType::Repurchase.to_string(), "repurchase");
    }

    #[test]
    fn test_item_data_price_normalization() {
        let numeric = ItemData::from_value(json!({"price": 10})).unwrap();
        assert_eq!(numeric.price().as_deref(), Some("10"));

        let decimal = ItemData::from_value(json!({"price": 2.5})).unwrap();
        assert_eq!(decimal.price().as_deref(), Some("2.5"));

        let legacy = ItemData::from_value(json!({"amount": "7.00"})).unwrap();
        assert_eq!(legacy.price().as_deref(), Some("7.00"));

        let missing = ItemData::from_value(json!({"price": null})).unwrap();
        assert_eq!(missing.price(), None);
    }

    #[test]
    fn test_item_data_rejects_non_objects() {
        assert!(ItemData::from_value(json!([1, 2])).is_none());
        assert!(ItemData::from_value(json!("onetime")).is_none());
    }

    #[test]
    fn test_empty_currency_is_absent() {
        let item = ItemData::from_value(json!({"currency": "  "})).unwrap();
        assert_eq!(item.currency(), None);
    }

    #[test]
    fn test_purchase_request_serialization() {
        let request = PurchaseRequest {
            project_name: "demo".to_string(),
            product_id: "p1".to_string(),
            user_id: "device-1".to_string(),
            payment_method: PaymentMethod::Card,
            card_data: Some(CardData {
                card_number: "4111111111111111".to_string(),
                expiry: "12/30".to_string(),
                cvv: "123".to_string(),
                name: "Jane Doe".to_string(),
                card_type: CardBrand::Visa,
            }),
            paypal_data: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["projectName"], "demo");
        assert_eq!(value["paymentMethod"], "card");
        assert_eq!(value["cardData"]["cardNumber"], "4111111111111111");
        assert_eq!(value["cardData"]["cardType"], "visa");
        assert!(value.get("paypalData").is_none());
    }

    #[test]
    fn test_card_data_display_masks_number() {
        let card = CardData {
            card_number: "4111111111111111".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
            name: "Jane Doe".to_string(),
            card_type: CardBrand::Visa,
        };
        assert_eq!(card.to_string(), "visa ending 1111");
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ApiEnvelope = serde_json::from_value(json!({"message": "nope"})).unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.error_text(), Some("nope"));

        let envelope: ApiEnvelope =
            serde_json::from_value(json!({"success": false, "error": "a", "message": "b"})).unwrap();
        assert_eq!(envelope.error_text(), Some("a"));
    }
}
