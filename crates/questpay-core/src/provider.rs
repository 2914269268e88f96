//! Provider adapters
//!
//! Redirect targets and backend paths for the two providers. PayPal needs no
//! server round trip: the link alone starts its flow. Stripe goes through a
//! session created by the backend.

use crate::error::Result;
use crate::intent::{GemsBlock, GiftPayload};

pub const PAYPAL_CHECKOUT_PATH: &str = "/paypal/checkout";
pub const PAYPAL_SUBSCRIBE_PATH: &str = "/paypal/subscribe";

/// Subscription offered when a PayPal subscribe link is built without one
pub const DEFAULT_PAYPAL_SUBSCRIPTION: &str = "basic_earned";

pub const STRIPE_CHECKOUT_SESSION_PATH: &str = "/stripe/checkout-session";
pub const STRIPE_EDIT_PATH: &str = "/stripe/subscribe/edit";
pub const GROUP_CREATE_PLAN_PATH: &str = "/api/v4/groups/create-plan";

/// Window target for provider pages
pub const NEW_WINDOW: &str = "_blank";

/// PayPal redirect links
pub struct PaypalLinks;

impl PaypalLinks {
    /// Checkout link carrying the gift as URI-encoded JSON
    pub fn gift(gift: &GiftPayload) -> Result<String> {
        let encoded = serde_json::to_string(gift)?;
        Ok(format!(
            "{PAYPAL_CHECKOUT_PATH}?gift={}",
            urlencoding::encode(&encoded)
        ))
    }

    pub fn gems(block: &GemsBlock) -> String {
        format!(
            "{PAYPAL_CHECKOUT_PATH}?gemsBlock={}",
            urlencoding::encode(&block.key)
        )
    }

    pub fn sku(sku: &str) -> String {
        format!("{PAYPAL_CHECKOUT_PATH}?sku={}", urlencoding::encode(sku))
    }

    /// Subscribe link; falls back to [`DEFAULT_PAYPAL_SUBSCRIPTION`]
    pub fn subscribe(key: Option<&str>, coupon: Option<&str>) -> String {
        let key = key.unwrap_or(DEFAULT_PAYPAL_SUBSCRIPTION);
        let mut link = format!("{PAYPAL_SUBSCRIBE_PATH}?sub={}", urlencoding::encode(key));
        if let Some(coupon) = coupon {
            link.push_str("&coupon=");
            link.push_str(&urlencoding::encode(coupon));
        }
        link
    }
}

/// Backend endpoint that creates a Stripe checkout session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEndpoint {
    /// `/stripe/checkout-session`
    CheckoutSession,
    /// `/api/v4/groups/create-plan`, creates the group as well
    CreateGroupPlan,
}

impl SessionEndpoint {
    pub const fn path(&self) -> &'static str {
        match self {
            Self::CheckoutSession => STRIPE_CHECKOUT_SESSION_PATH,
            Self::CreateGroupPlan => GROUP_CREATE_PLAN_PATH,
        }
    }
}

/// Cancellation path for the provider named by a plan's payment method.
///
/// Stored method names may be capitalized or multi-word
/// ("Amazon Payments"); the first word, lower-cased, names the route.
pub fn cancel_path(payment_method: &str, group_id: Option<&str>) -> String {
    let provider = payment_method
        .split_whitespace()
        .next()
        .unwrap_or(payment_method)
        .to_lowercase();

    let mut path = format!("/{provider}/subscribe/cancel?noRedirect=true");
    if let Some(id) = group_id {
        path.push_str("&groupId=");
        path.push_str(&urlencoding::encode(id));
    }
    path
}
