//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Checkout and cancellation errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Gem purchase or gift of gems with a zero or missing amount
    #[error("Invalid amount of gems to purchase")]
    InvalidGemAmount,

    /// Gift request that cannot name its receiver
    #[error("Invalid gift: {0}")]
    InvalidGift(String),

    /// Purchase kind the chosen provider does not handle
    #[error("Unsupported purchase: {0}")]
    Unsupported(String),

    /// No plan to cancel
    #[error("No payment method on the active plan")]
    MissingPaymentMethod,

    /// Hosted checkout overlay reported a failure
    #[error("Error while redirecting to Stripe: {message}")]
    Checkout { message: String },

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the backend
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response or stored value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Shared store read/write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Store change channel closed before a matching event arrived
    #[error("Store channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if the user can simply retry the action
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Checkout { .. } | Self::Api { .. } | Self::Http(_) | Self::Storage(_)
        )
    }

    /// Message shown to the user in a blocking alert.
    ///
    /// Backend failures surface the raw server message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidGemAmount => "Please choose a valid amount of gems.".into(),
            Self::InvalidGift(_) => "Please choose who should receive the gift.".into(),
            Self::Checkout { message } => format!("Error while redirecting to Stripe: {message}"),
            Self::Api { message, .. } => message.clone(),
            Self::Http(_) => "Could not reach the server. Please try again.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_surfaces_raw_message() {
        let err = PaymentError::Api {
            status: 401,
            message: "Subscription is not active".into(),
        };
        assert_eq!(err.user_message(), "Subscription is not active");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_validation_is_not_retryable() {
        assert!(!PaymentError::InvalidGemAmount.is_retryable());
    }
}
