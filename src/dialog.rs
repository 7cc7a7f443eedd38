//! Checkout dialog state machine.
//!
//! The dialog is headless: [`CheckoutDialog`] holds the steps, field values,
//! validation errors and the text a host UI renders. A host implements
//! [`DialogPresenter`] (or uses [`ChannelPresenter`]) to drive it and report a
//! [`DialogOutcome`] back to the purchase session.
//!
//! ```text
//! SelectMethod --select_method--> EnterDetails --submit--> Submitted
//!      |                               |
//!      +------------close--------------+-------> Cancelled
//! ```

use crate::context::PurchaseContext;
use crate::types::{ItemType, PaymentMethod};
use crate::utils::format_amount;
use crate::validators::FieldValidator;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const CARD_FIELDS: [Field; 4] = [
    Field::CardNumber,
    Field::Expiry,
    Field::Cvv,
    Field::CardholderName,
];
const PAYPAL_FIELDS: [Field; 1] = [Field::Email];

/// Which flavour of checkout is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    /// Single purchase
    Onetime,
    /// Consumable bought again
    Repurchase,
    /// Recurring subscription
    Subscription,
}

impl DialogKind {
    /// Dialog title for this kind.
    pub fn title(&self) -> &'static str {
        match self {
            DialogKind::Onetime => "One-Time Purchase",
            DialogKind::Repurchase => "Repurchase Item",
            DialogKind::Subscription => "Subscription",
        }
    }
}

impl From<ItemType> for DialogKind {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Onetime => DialogKind::Onetime,
            ItemType::Repurchase => DialogKind::Repurchase,
            ItemType::Subscription => DialogKind::Subscription,
        }
    }
}

/// Current step of the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStep {
    /// Choosing card or PayPal
    SelectMethod,
    /// Filling in the payment fields
    EnterDetails,
    /// Details accepted
    Submitted,
    /// Closed without paying
    Cancelled,
}

impl DialogStep {
    /// Whether the dialog is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogStep::Submitted | DialogStep::Cancelled)
    }
}

/// Input fields the dialog can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Card number
    CardNumber,
    /// Card expiry, `MM/YY`
    Expiry,
    /// Card security code
    Cvv,
    /// Name on the card
    CardholderName,
    /// PayPal account e-mail
    Email,
}

impl Field {
    /// Hint text for the field.
    pub fn label(&self) -> &'static str {
        match self {
            Field::CardNumber => "Card Number",
            Field::Expiry => "Expiry (MM/YY)",
            Field::Cvv => "CVV",
            Field::CardholderName => "Cardholder Name",
            Field::Email => "PayPal Email Address",
        }
    }

    /// Validator applied to the field.
    pub fn validator(&self) -> FieldValidator {
        match self {
            Field::CardNumber => FieldValidator::card_number(),
            Field::Expiry => FieldValidator::expiry(),
            Field::Cvv => FieldValidator::cvv(),
            Field::CardholderName => FieldValidator::cardholder_name(),
            Field::Email => FieldValidator::email(),
        }
    }
}

/// Payment details collected by a submitted dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentDetails {
    /// Card payment
    Card {
        /// Card number
        number: String,
        /// Expiry, `MM/YY`
        expiry: String,
        /// Security code
        cvv: String,
        /// Cardholder name
        name: String,
    },
    /// PayPal payment
    Paypal {
        /// PayPal account e-mail
        email: String,
    },
}

impl PaymentDetails {
    /// Payment method of these details.
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::Paypal { .. } => PaymentMethod::Paypal,
        }
    }
}

/// How a dialog ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    /// The user submitted valid details
    Submitted(PaymentDetails),
    /// The user closed the dialog
    Cancelled,
}

/// Rejected dialog interaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogError {
    /// The action is not available in the current step
    #[error("Action not allowed in step {0:?}")]
    WrongStep(DialogStep),

    /// The field is not shown for the selected payment method
    #[error("Field {0:?} is not shown for this payment method")]
    HiddenField(Field),

    /// A field failed validation; carries the first failure
    #[error("{message}")]
    Invalid {
        /// Field whose validator failed first
        field: Field,
        /// That validator's message
        message: String,
    },
}

/// Headless two-step checkout dialog.
#[derive(Debug, Clone)]
pub struct CheckoutDialog {
    kind: DialogKind,
    title: String,
    product_name: Option<String>,
    product_description: Option<String>,
    amount_text: Option<String>,
    step: DialogStep,
    method: Option<PaymentMethod>,
    values: HashMap<Field, String>,
    errors: HashMap<Field, String>,
    today: Option<NaiveDate>,
    submitted: Option<PaymentDetails>,
}

impl CheckoutDialog {
    /// Builds the dialog from a validated purchase context.
    pub fn new(kind: DialogKind, context: &PurchaseContext) -> Self {
        let item = context.item_data();
        let non_empty = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);

        Self {
            kind,
            title: kind.title().to_string(),
            product_name: non_empty(item.and_then(|i| i.name())),
            product_description: non_empty(item.and_then(|i| i.description())),
            amount_text: format_amount(context.price(), context.currency(), context.label()),
            step: DialogStep::SelectMethod,
            method: None,
            values: HashMap::new(),
            errors: HashMap::new(),
            today: None,
            submitted: None,
        }
    }

    /// Pins the date used by the expiry check.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Kind of checkout shown.
    pub fn kind(&self) -> DialogKind {
        self.kind
    }

    /// Current step.
    pub fn step(&self) -> DialogStep {
        self.step
    }

    /// Title currently shown; changes once a method is picked.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Item name, when the backend sent one.
    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    /// Item description, when the backend sent one.
    pub fn product_description(&self) -> Option<&str> {
        self.product_description.as_deref()
    }

    /// Amount line such as `"Price: $4.99"`, hidden when there is no price.
    pub fn amount_text(&self) -> Option<&str> {
        self.amount_text.as_deref()
    }

    /// Method picked in the first step.
    pub fn selected_method(&self) -> Option<PaymentMethod> {
        self.method
    }

    /// Confirmation text for the picked method.
    pub fn selected_method_text(&self) -> Option<&'static str> {
        self.method.map(|m| match m {
            PaymentMethod::Card => "You selected: Card",
            PaymentMethod::Paypal => "You selected: PayPal",
        })
    }

    /// Label of the submit button.
    pub fn submit_label(&self) -> &'static str {
        match self.method {
            Some(PaymentMethod::Paypal) => "Pay with PayPal",
            _ => "Pay",
        }
    }

    /// Fields shown in the current step.
    pub fn visible_fields(&self) -> &'static [Field] {
        match (self.step, self.method) {
            (DialogStep::EnterDetails, Some(PaymentMethod::Card)) => &CARD_FIELDS,
            (DialogStep::EnterDetails, Some(PaymentMethod::Paypal)) => &PAYPAL_FIELDS,
            _ => &[],
        }
    }

    /// Raw value entered in a field.
    pub fn field_value(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Error currently shown under a field.
    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Picks the payment method and moves to the details step.
    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), DialogError> {
        if self.step != DialogStep::SelectMethod {
            return Err(DialogError::WrongStep(self.step));
        }
        self.method = Some(method);
        self.title = match method {
            PaymentMethod::Card => "Input details",
            PaymentMethod::Paypal => "PayPal Payment",
        }
        .to_string();
        self.step = DialogStep::EnterDetails;
        Ok(())
    }

    /// Updates a field and re-runs its validators.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<(), DialogError> {
        if self.step != DialogStep::EnterDetails {
            return Err(DialogError::WrongStep(self.step));
        }
        if !self.visible_fields().contains(&field) {
            return Err(DialogError::HiddenField(field));
        }
        let value = value.into();
        self.refresh_error(field, &value);
        self.values.insert(field, value);
        Ok(())
    }

    fn refresh_error(&mut self, field: Field, value: &str) -> bool {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        match field.validator().validate_at(value, today) {
            Ok(()) => {
                self.errors.remove(&field);
                true
            }
            Err(message) => {
                self.errors.insert(field, message.to_string());
                false
            }
        }
    }

    fn trimmed(&self, field: Field) -> String {
        self.field_value(field).unwrap_or_default().trim().to_string()
    }

    /// Validates every visible field and, if all pass, submits the dialog.
    ///
    /// On failure the state is unchanged and the first failing field is returned.
    pub fn submit(&mut self) -> Result<PaymentDetails, DialogError> {
        if self.step != DialogStep::EnterDetails {
            return Err(DialogError::WrongStep(self.step));
        }

        let mut first_failure = None;
        for field in self.visible_fields() {
            let value = self.field_value(*field).unwrap_or_default().to_string();
            if !self.refresh_error(*field, &value) && first_failure.is_none() {
                first_failure = Some(*field);
            }
        }
        if let Some(field) = first_failure {
            let message = self.errors.get(&field).cloned().unwrap_or_default();
            debug!(?field, %message, "checkout submission rejected");
            return Err(DialogError::Invalid { field, message });
        }

        let details = match self.method {
            Some(PaymentMethod::Paypal) => PaymentDetails::Paypal {
                email: self.trimmed(Field::Email),
            },
            _ => PaymentDetails::Card {
                number: self.trimmed(Field::CardNumber),
                expiry: self.trimmed(Field::Expiry),
                cvv: self.trimmed(Field::Cvv),
                name: self.trimmed(Field::CardholderName),
            },
        };
        self.step = DialogStep::Submitted;
        self.submitted = Some(details.clone());
        Ok(details)
    }

    /// Closes the dialog without paying.
    pub fn close(&mut self) -> Result<(), DialogError> {
        if self.step.is_terminal() {
            return Err(DialogError::WrongStep(self.step));
        }
        self.step = DialogStep::Cancelled;
        Ok(())
    }

    /// Outcome once the dialog reached a terminal step.
    pub fn outcome(&self) -> Option<DialogOutcome> {
        match self.step {
            DialogStep::Submitted => self.submitted.clone().map(DialogOutcome::Submitted),
            DialogStep::Cancelled => Some(DialogOutcome::Cancelled),
            _ => None,
        }
    }
}

/// Shows a checkout dialog and waits for the user to finish it.
#[async_trait]
pub trait DialogPresenter: Send + Sync {
    /// Presents `dialog`; resolves once it is submitted or closed.
    async fn present(&self, dialog: CheckoutDialog) -> DialogOutcome;
}

/// A dialog waiting for the host UI.
#[derive(Debug)]
pub struct DialogRequest {
    /// The dialog to drive
    pub dialog: CheckoutDialog,
    responder: oneshot::Sender<DialogOutcome>,
}

impl DialogRequest {
    /// Reports the dialog's outcome, treating an unfinished dialog as cancelled.
    pub fn finish(self) {
        let outcome = self.dialog.outcome().unwrap_or(DialogOutcome::Cancelled);
        self.respond(outcome);
    }

    /// Reports `outcome` to the waiting session.
    pub fn respond(self, outcome: DialogOutcome) {
        if self.responder.send(outcome).is_err() {
            debug!("purchase session gone before dialog finished");
        }
    }
}

/// Presenter that hands dialogs to a UI task over a channel.
///
/// A request dropped without a response counts as a cancellation.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::Sender<DialogRequest>,
}

impl ChannelPresenter {
    /// Creates the presenter and the receiving end for the UI task.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DialogRequest>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DialogPresenter for ChannelPresenter {
    async fn present(&self, dialog: CheckoutDialog) -> DialogOutcome {
        let (responder, response) = oneshot::channel();
        if self.tx.send(DialogRequest { dialog, responder }).await.is_err() {
            warn!("dialog receiver closed; treating purchase as cancelled");
            return DialogOutcome::Cancelled;
        }
        response.await.unwrap_or(DialogOutcome::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemData;
    use serde_json::json;

    fn context() -> PurchaseContext {
        let mut context = PurchaseContext::new();
        context.set_purchase_context("p1");
        context.set_item_data(
            ItemData::from_value(json!({
                "type": "onetime",
                "name": "Pro Pack",
                "description": "All the things",
                "price": 4.99,
                "currency": "EUR"
            }))
            .unwrap(),
            ItemType::Onetime,
        );
        context
    }

    fn dialog() -> CheckoutDialog {
        CheckoutDialog::new(DialogKind::Onetime, &context())
            .with_today(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    #[test]
    fn test_initial_view() {
        let dialog = dialog();
        assert_eq!(dialog.step(), DialogStep::SelectMethod);
        assert_eq!(dialog.title(), "One-Time Purchase");
        assert_eq!(dialog.product_name(), Some("Pro Pack"));
        assert_eq!(dialog.amount_text(), Some("Price: €4.99"));
        assert!(dialog.visible_fields().is_empty());
        assert_eq!(dialog.outcome(), None);
    }

    #[test]
    fn test_kind_titles() {
        assert_eq!(DialogKind::from(ItemType::Repurchase).title(), "Repurchase Item");
        assert_eq!(DialogKind::from(ItemType::Subscription).title(), "Subscription");
    }

    #[test]
    fn test_card_flow() {
        let mut dialog = dialog();
        dialog.select_method(PaymentMethod::Card).unwrap();
        assert_eq!(dialog.title(), "Input details");
        assert_eq!(dialog.selected_method_text(), Some("You selected: Card"));
        assert_eq!(dialog.visible_fields().len(), 4);

        dialog.set_field(Field::CardNumber, "4111111111111111").unwrap();
        dialog.set_field(Field::Expiry, "06/25").unwrap();
        dialog.set_field(Field::Cvv, "123").unwrap();
        dialog.set_field(Field::CardholderName, " Jane Doe ").unwrap();

        let details = dialog.submit().unwrap();
        assert_eq!(
            details,
            PaymentDetails::Card {
                number: "4111111111111111".to_string(),
                expiry: "06/25".to_string(),
                cvv: "123".to_string(),
                name: "Jane Doe".to_string(),
            }
        );
        assert_eq!(dialog.step(), DialogStep::Submitted);
        assert_eq!(dialog.outcome(), Some(DialogOutcome::Submitted(details)));
    }

    #[test]
    fn test_invalid_submission_keeps_state() {
        let mut dialog = dialog();
        dialog.select_method(PaymentMethod::Card).unwrap();
        dialog.set_field(Field::CardNumber, "4111111111111112").unwrap();
        dialog.set_field(Field::Expiry, "05/25").unwrap();

        let err = dialog.submit().unwrap_err();
        assert_eq!(
            err,
            DialogError::Invalid {
                field: Field::CardNumber,
                message: "Invalid card number".to_string(),
            }
        );
        assert_eq!(dialog.step(), DialogStep::EnterDetails);
        assert_eq!(dialog.field_error(Field::Expiry), Some("Use a valid MM/YY date"));
        assert_eq!(dialog.field_error(Field::Cvv), Some("CVV is required"));
    }

    #[test]
    fn test_live_validation_toggles_error() {
        let mut dialog = dialog();
        dialog.select_method(PaymentMethod::Card).unwrap();
        dialog.set_field(Field::Cvv, "12").unwrap();
        assert_eq!(dialog.field_error(Field::Cvv), Some("Invalid CVV"));
        dialog.set_field(Field::Cvv, "123").unwrap();
        assert_eq!(dialog.field_error(Field::Cvv), None);
    }

    #[test]
    fn test_paypal_flow() {
        let mut dialog = dialog();
        dialog.select_method(PaymentMethod::Paypal).unwrap();
        assert_eq!(dialog.title(), "PayPal Payment");
        assert_eq!(dialog.submit_label(), "Pay with PayPal");
        assert_eq!(
            dialog.set_field(Field::CardNumber, "4111111111111111"),
            Err(DialogError::HiddenField(Field::CardNumber))
        );

        dialog.set_field(Field::Email, "payer@example").unwrap();
        assert!(dialog.submit().is_err());

        dialog.set_field(Field::Email, "payer@example.com").unwrap();
        let details = dialog.submit().unwrap();
        assert_eq!(details.method(), PaymentMethod::Paypal);
    }

    #[test]
    fn test_no_back_navigation() {
        let mut dialog = dialog();
        dialog.select_method(PaymentMethod::Card).unwrap();
        assert_eq!(
            dialog.select_method(PaymentMethod::Paypal),
            Err(DialogError::WrongStep(DialogStep::EnterDetails))
        );
    }

    #[test]
    fn test_close_from_any_open_step() {
        let mut dialog = dialog();
        dialog.close().unwrap();
        assert_eq!(dialog.outcome(), Some(DialogOutcome::Cancelled));
        assert!(dialog.close().is_err());
        assert!(dialog.submit().is_err());

        let mut dialog = self::dialog();
        dialog.select_method(PaymentMethod::Paypal).unwrap();
        dialog.close().unwrap();
        assert_eq!(dialog.step(), DialogStep::Cancelled);
    }

    #[tokio::test]
    async fn test_channel_presenter_round_trip() {
        let (presenter, mut requests) = ChannelPresenter::new(1);

        let ui = tokio::spawn(async move {
            let mut request = requests.recv().await.unwrap();
            request.dialog.close().unwrap();
            request.finish();
        });

        let outcome = presenter.present(dialog()).await;
        assert_eq!(outcome, DialogOutcome::Cancelled);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_presenter_dropped_receiver() {
        let (presenter, requests) = ChannelPresenter::new(1);
        drop(requests);
        assert_eq!(presenter.present(dialog()).await, DialogOutcome::Cancelled);
    }
}
