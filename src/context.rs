//! Transient state of one purchase attempt.
//!
//! A [`PurchaseContext`] links the item being bought to the checkout dialog
//! and the payment submission. Each purchase session owns its own context, so
//! two attempts never share state.

use crate::types::{ItemData, ItemType, DEFAULT_CURRENCY};

/// State of the in-flight purchase.
///
/// The item key is set as soon as a purchase starts; the item type and
/// metadata only after the backend validated the item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseContext {
    item_key: Option<String>,
    item_type: Option<ItemType>,
    item_data: Option<ItemData>,
    price: Option<String>,
    currency: Option<String>,
    label: Option<String>,
}

impl PurchaseContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the item key of a purchase that is starting.
    pub fn set_purchase_context(&mut self, item_key: impl Into<String>) {
        self.item_key = Some(item_key.into());
    }

    /// Stores validated item metadata and derives the display price.
    ///
    /// # Examples
    ///
    /// ```
    /// use inapppay_rs::context::PurchaseContext;
    /// use inapppay_rs::types::{ItemData, ItemType};
    /// use serde_json::json;
    ///
    /// let mut context = PurchaseContext::new();
    /// context.set_purchase_context("premium");
    /// let data = ItemData::from_value(json!({"type": "onetime", "price": 3})).unwrap();
    /// context.set_item_data(data, ItemType::Onetime);
    ///
    /// assert!(context.is_valid());
    /// assert_eq!(context.price(), Some("3"));
    /// assert_eq!(context.currency(), "USD");
    /// ```
    pub fn set_item_data(&mut self, item_data: ItemData, item_type: ItemType) {
        self.price = item_data.price();
        self.currency = item_data.currency().map(str::to_string);
        self.label = item_data.label().map(str::to_string);
        self.item_data = Some(item_data);
        self.item_type = Some(item_type);
    }

    /// Overrides the display price.
    pub fn set_price(&mut self, price: impl Into<String>) {
        self.price = Some(price.into());
    }

    /// Overrides the label shown in front of the price.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// True when item key, item type and item data are all present.
    pub fn is_valid(&self) -> bool {
        self.item_key.is_some() && self.item_type.is_some() && self.item_data.is_some()
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Product id of the purchase.
    pub fn item_key(&self) -> Option<&str> {
        self.item_key.as_deref()
    }

    /// Item type reported by validation.
    pub fn item_type(&self) -> Option<ItemType> {
        self.item_type
    }

    /// Item metadata reported by validation.
    pub fn item_data(&self) -> Option<&ItemData> {
        self.item_data.as_ref()
    }

    /// Display price.
    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    /// Currency code, `"USD"` when the item has none.
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// Label shown in front of the price.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
