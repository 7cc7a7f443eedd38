//! Error types for the inapppay-rs library.
//!
//! Every failure a purchase attempt or status check can end in is a variant of
//! [`InAppPayError`]. Each variant carries a human-readable message and a
//! stable machine code, exposed through [`InAppPayError::message`] and
//! [`InAppPayError::code`].

use thiserror::Error;

/// Main error type for SDK operations.
#[derive(Error, Debug)]
pub enum InAppPayError {
    /// No device identifier could be obtained
    #[error("Could not get device ID")]
    MissingDeviceId,

    /// The SDK was configured without a project name
    #[error("Project name is required")]
    MissingProjectName,

    /// The backend returned an item type the SDK has no dialog for
    #[error("Unknown item type: {0}")]
    InvalidItemType(String),

    /// The backend refused the item for purchase
    #[error("{message}")]
    ValidationFailed {
        /// Message reported by the backend
        message: String,
        /// Backend error code, or `VALIDATION_FAILED`
        code: String,
    },

    /// A payment was submitted without a fully populated purchase context
    #[error("Invalid purchase context")]
    InvalidContext,

    /// The user closed the checkout dialog or the attempt was cancelled
    #[error("Purchase cancelled by user")]
    UserCancelled,

    /// The backend declined or failed the payment
    #[error("{message}")]
    PurchaseFailed {
        /// Message reported by the backend
        message: String,
        /// Backend error code, or `PURCHASE_FAILED`
        code: String,
    },

    /// A status check or listing call was answered with `success: false`
    #[error("{message}")]
    CheckFailed {
        /// Message reported by the backend
        message: String,
        /// `CHECK_FAILED`, `GET_PURCHASES_FAILED` or `GET_SUBSCRIPTIONS_FAILED`
        code: String,
    },

    /// The backend answered with a non-success HTTP status
    #[error("{message}")]
    ServerError {
        /// Message taken from the error body
        message: String,
        /// Code taken from the error body, else `SERVER_ERROR` (`UNKNOWN_ERROR` for an empty body)
        code: String,
    },

    /// The request never produced an HTTP response
    #[error("Network error: {0}")]
    Network(String),

    /// The response did not have the shape the operation expects
    #[error("Failed to parse response: {0}")]
    ParseFailed(String),

    /// A pattern rule was built from an invalid regular expression
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error parsing the backend URL
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl InAppPayError {
    /// Machine-readable code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use inapppay_rs::InAppPayError;
    ///
    /// assert_eq!(InAppPayError::UserCancelled.code(), "USER_CANCELLED");
    /// ```
    pub fn code(&self) -> &str {
        match self {
            InAppPayError::MissingDeviceId => "MISSING_DEVICE_ID",
            InAppPayError::MissingProjectName => "MISSING_PROJECT_NAME",
            InAppPayError::InvalidItemType(_) => "INVALID_ITEM_TYPE",
            InAppPayError::ValidationFailed { code, .. }
            | InAppPayError::PurchaseFailed { code, .. }
            | InAppPayError::CheckFailed { code, .. }
            | InAppPayError::ServerError { code, .. } => code,
            InAppPayError::InvalidContext => "INVALID_CONTEXT",
            InAppPayError::UserCancelled => "USER_CANCELLED",
            InAppPayError::Network(_) => "NETWORK_ERROR",
            InAppPayError::ParseFailed(_) => "ERROR_PARSE_FAILED",
            InAppPayError::InvalidPattern(_) => "INVALID_PATTERN",
            InAppPayError::Config(_) => "CONFIG_ERROR",
            InAppPayError::UrlParse(_) => "CONFIG_ERROR",
        }
    }

    /// Human-readable message for this error.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if the error came from the backend rather than the SDK or transport.
    pub fn is_backend_rejection(&self) -> bool {
        matches!(
            self,
            InAppPayError::ValidationFailed { .. }
                | InAppPayError::PurchaseFailed { .. }
                | InAppPayError::CheckFailed { .. }
                | InAppPayError::ServerError { .. }
        )
    }
}

impl From<reqwest::Error> for InAppPayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InAppPayError::ParseFailed(err.to_string())
        } else {
            InAppPayError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for InAppPayError {
    fn from(err: serde_json::Error) -> Self {
        InAppPayError::ParseFailed(err.to_string())
    }
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, InAppPayError>;
