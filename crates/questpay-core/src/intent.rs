//! Payment Intent
//!
//! The normalized purchase record written to the shared store before the
//! user leaves for a provider, and the other value that can live in the same
//! slot (the group cancellation marker).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Well-known shared store key holding the saved app state
pub const SAVED_APP_STATE: &str = "saved-app-state";

/// Payment provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[serde(alias = "Stripe")]
    Stripe,
    #[serde(alias = "Paypal", alias = "PayPal")]
    Paypal,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being bought
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "sku")]
    Sku,
    #[serde(rename = "gift-gems")]
    GiftGems,
    #[serde(rename = "gift-subscription")]
    GiftSubscription,
    #[serde(rename = "groupPlan")]
    GroupPlan,
    #[serde(rename = "subscription")]
    Subscription,
    #[serde(rename = "gems")]
    Gems,
}

impl PaymentType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sku => "sku",
            Self::GiftGems => "gift-gems",
            Self::GiftSubscription => "gift-subscription",
            Self::GroupPlan => "groupPlan",
            Self::Subscription => "subscription",
            Self::Gems => "gems",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of gift
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftKind {
    Gems,
    Subscription,
}

/// Gems part of a gift payload
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemsGift {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Subscription part of a gift payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionGift {
    pub key: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Gift payload, carried verbatim from the request into the intent.
///
/// Fields this crate does not interpret (message, flags) stay in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GiftPayload {
    #[serde(rename = "type")]
    pub kind: GiftKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems: Option<GemsGift>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionGift>,

    /// Receiver user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GiftPayload {
    /// Gem amount, zero when absent
    pub fn gem_amount(&self) -> u32 {
        self.gems.as_ref().and_then(|g| g.amount).unwrap_or(0)
    }

    pub fn subscription_key(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.key.as_str())
    }

    /// Attach the receiver id
    #[must_use]
    pub fn with_receiver(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

/// A purchasable block of gems
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GemsBlock {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GemsBlock {
    pub fn new(key: impl Into<String>, gems: u32) -> Self {
        Self {
            key: key.into(),
            gems: Some(gems),
            extra: Map::new(),
        }
    }
}

/// Projection of a group kept in the intent
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,
}

/// Type-specific part of an intent, tagged by `paymentType`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "paymentType", rename_all_fields = "camelCase")]
pub enum IntentKind {
    #[serde(rename = "sku")]
    Sku { sku: String },

    #[serde(rename = "gift-gems")]
    GiftGems {
        gift: GiftPayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gift_receiver: Option<String>,
    },

    #[serde(rename = "gift-subscription")]
    GiftSubscription {
        gift: GiftPayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gift_receiver: Option<String>,
    },

    #[serde(rename = "groupPlan")]
    GroupPlan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscription_key: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        new_signup: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_group: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<GroupSummary>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },

    #[serde(rename = "subscription")]
    Subscription {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscription_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },

    #[serde(rename = "gems")]
    Gems { gems_block: GemsBlock },
}

impl IntentKind {
    pub const fn payment_type(&self) -> PaymentType {
        match self {
            Self::Sku { .. } => PaymentType::Sku,
            Self::GiftGems { .. } => PaymentType::GiftGems,
            Self::GiftSubscription { .. } => PaymentType::GiftSubscription,
            Self::GroupPlan { .. } => PaymentType::GroupPlan,
            Self::Subscription { .. } => PaymentType::Subscription,
            Self::Gems { .. } => PaymentType::Gems,
        }
    }
}

/// Normalized purchase record stored under [`SAVED_APP_STATE`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub payment_method: PaymentMethod,

    /// Flipped to true only by the page receiving the provider callback
    pub payment_completed: bool,

    /// Set for the "update payment details" flow
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_stripe_edit: bool,

    #[serde(flatten)]
    pub kind: IntentKind,
}

impl PaymentIntent {
    /// Create a pending intent
    pub const fn new(payment_method: PaymentMethod, kind: IntentKind) -> Self {
        Self {
            payment_method,
            payment_completed: false,
            is_stripe_edit: false,
            kind,
        }
    }

    pub const fn payment_type(&self) -> PaymentType {
        self.kind.payment_type()
    }

    /// Mark the intent completed.
    ///
    /// Returns `false` when it already was; completion happens once.
    pub fn mark_completed(&mut self) -> bool {
        if self.payment_completed {
            return false;
        }
        self.payment_completed = true;
        true
    }
}

/// Marker written after a group plan was cancelled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPlanCanceled {
    pub group_plan_canceled: bool,
}

/// Everything that may live in the saved app state slot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavedAppState {
    Payment(PaymentIntent),
    GroupPlanCanceled(GroupPlanCanceled),
}

impl SavedAppState {
    pub const fn group_plan_canceled() -> Self {
        Self::GroupPlanCanceled(GroupPlanCanceled {
            group_plan_canceled: true,
        })
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// True only for a payment intent whose completion was recorded
    pub const fn payment_completed(&self) -> bool {
        matches!(self, Self::Payment(intent) if intent.payment_completed)
    }
}

impl From<PaymentIntent> for SavedAppState {
    fn from(intent: PaymentIntent) -> Self {
        Self::Payment(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_intent_wire_format() {
        let intent = PaymentIntent::new(
            PaymentMethod::Stripe,
            IntentKind::Subscription {
                subscription_key: Some("basic_3mo".into()),
                group_id: None,
            },
        );

        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            value,
            json!({
                "paymentMethod": "stripe",
                "paymentCompleted": false,
                "paymentType": "subscription",
                "subscriptionKey": "basic_3mo",
            })
        );
    }

    #[test]
    fn test_gift_payload_keeps_unknown_fields() {
        let raw = json!({
            "paymentMethod": "paypal",
            "paymentCompleted": true,
            "paymentType": "gift-gems",
            "gift": {
                "type": "gems",
                "gems": { "amount": 20, "fromBalance": false },
                "message": "enjoy",
                "uuid": "receiver-1",
            },
            "giftReceiver": "Wren",
        });

        let state: SavedAppState = serde_json::from_value(raw.clone()).unwrap();
        assert!(state.payment_completed());

        let SavedAppState::Payment(intent) = &state else {
            panic!("expected payment intent");
        };
        assert_eq!(intent.payment_type(), PaymentType::GiftGems);
        assert_eq!(serde_json::to_value(&state).unwrap(), raw);
    }

    #[test]
    fn test_cancel_marker_is_not_a_completion() {
        let state = SavedAppState::decode(r#"{"groupPlanCanceled":true}"#).unwrap();
        assert_eq!(state, SavedAppState::group_plan_canceled());
        assert!(!state.payment_completed());
    }

    #[test]
    fn test_capitalized_payment_method_alias() {
        let method: PaymentMethod = serde_json::from_str("\"Stripe\"").unwrap();
        assert_eq!(method, PaymentMethod::Stripe);
        assert_eq!(method.to_string(), "stripe");
    }

    #[test]
    fn test_completion_transitions_once() {
        let mut intent = PaymentIntent::new(
            PaymentMethod::Paypal,
            IntentKind::Sku {
                sku: "Pet-Gryphatrice-Jubilant".into(),
            },
        );
        assert!(intent.mark_completed());
        assert!(!intent.mark_completed());
        assert!(intent.payment_completed);
    }
}
