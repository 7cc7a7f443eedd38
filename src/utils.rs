//! Utility functions for checkout presentation.
//!
//! Card-brand detection, currency symbols, the amount line shown in the
//! dialog, and the mapping from error codes to user-facing text.

use crate::types::CardBrand;

/// Detects the card brand from the first digit of the number.
///
/// Whitespace is ignored.
///
/// # Examples
///
/// ```
/// use inapppay_rs::types::CardBrand;
/// use inapppay_rs::utils::detect_card_brand;
///
/// assert_eq!(detect_card_brand("4111 1111 1111 1111"), CardBrand::Visa);
/// assert_eq!(detect_card_brand(""), CardBrand::Unknown);
/// ```
pub fn detect_card_brand(card_number: &str) -> CardBrand {
    match card_number.chars().find(|c| !c.is_whitespace()) {
        Some('4') => CardBrand::Visa,
        Some('5') | Some('2') => CardBrand::Mastercard,
        Some('3') => CardBrand::Amex,
        Some('6') => CardBrand::Discover,
        _ => CardBrand::Unknown,
    }
}

/// Symbol displayed for a currency code; `$` when unknown.
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_ascii_uppercase().as_str() {
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "CAD" => "C$",
        "AUD" => "A$",
        _ => "$",
    }
}

/// Formats the amount line of the checkout dialog.
///
/// Returns `None` when there is no price to show.
///
/// # Examples
///
/// ```
/// use inapppay_rs::utils::format_amount;
///
/// assert_eq!(format_amount(Some("4.99"), "EUR", None).as_deref(), Some("Price: €4.99"));
/// assert_eq!(format_amount(Some("4.99"), "USD", Some("Total")).as_deref(), Some("Total: $4.99"));
/// assert_eq!(format_amount(None, "USD", None), None);
/// ```
pub fn format_amount(price: Option<&str>, currency: &str, label: Option<&str>) -> Option<String> {
    let price = price.filter(|p| !p.is_empty())?;
    let display = format!("{}{}", currency_symbol(currency), price);
    match label.filter(|l| !l.is_empty()) {
        Some(label) => Some(format!("{}: {}", label, display)),
        None => Some(format!("Price: {}", display)),
    }
}

/// Converts an error message and code into text suitable for an end user.
pub fn user_friendly_message(message: &str, code: &str) -> String {
    if code.is_empty() {
        return message.to_string();
    }

    let text = match code {
        "PROJECT_NOT_FOUND" => "This app is not properly configured. Please contact support.",
        "PRODUCT_NOT_FOUND" => "The selected item is no longer available.",
        "PRODUCT_INACTIVE" => "This item is currently unavailable for purchase.",
        "MISSING_CARD_DATA" => "Credit card information is required to complete this purchase.",
        "MISSING_PAYPAL_DATA" => "PayPal information is required to complete this purchase.",
        "INVALID_PAYMENT_METHOD" => "Please select a valid payment method.",
        "ALREADY_PURCHASED" => "You have already purchased this item.",
        "ALREADY_SUBSCRIBED" => "You already have an active subscription for this item.",
        "DATABASE_ERROR" => {
            "We're experiencing technical difficulties. Your payment was not charged. Please try again later."
        }
        "MISSING_DEVICE_ID" => "Device identification failed. Please restart the app and try again.",
        "MISSING_PROJECT_NAME" => "App configuration error. Please contact support.",
        "INVALID_ITEM_TYPE" => "This item type is not supported.",
        "VALIDATION_FAILED" => "Unable to verify purchase details. Please try again.",
        "NETWORK_ERROR" => "Check your internet connection and try again.",
        "UNKNOWN_ERROR" => "An unexpected error occurred. Please try again.",
        "ERROR_PARSE_FAILED" => "Communication error with server. Please try again.",
        "USER_CANCELLED" => "The purchase was cancelled.",
        _ if message.contains("Transaction failed:") => return payment_failure_message(message),
        _ if message.contains("Network error:") => "Check your internet connection and try again.",
        _ => "Purchase could not be completed. Please try again or contact support.",
    };
    text.to_string()
}

fn payment_failure_message(message: &str) -> String {
    let lower = message.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    let text = if contains_any(&["card declined", "insufficient funds"]) {
        "Your card was declined. Please check your card details or try a different payment method."
    } else if contains_any(&["card expired", "expir"]) {
        "Your card has expired. Please use a different payment method."
    } else if contains_any(&["invalid card", "card number"]) {
        "Please check your card number and try again."
    } else if contains_any(&["cvv", "security code"]) {
        "Please check your card's security code and try again."
    } else if lower.contains("paypal") {
        "PayPal payment failed. Please try again or use a different payment method."
    } else if contains_any(&["timeout", "time out"]) {
        "Payment processing timed out. Please try again."
    } else {
        "Payment failed. Please check your payment details and try again."
    };
    text.to_string()
}
