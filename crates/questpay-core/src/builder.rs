//! Intent Builder
//!
//! Pure derivation from a classified [`PurchaseRequest`] to the intent that
//! is stored before leaving for a provider, plus the provider-specific
//! target: a PayPal link or a Stripe session-creation call.

use serde_json::{Map, Value, json};

use crate::account::Group;
use crate::error::{PaymentError, Result};
use crate::intent::{IntentKind, PaymentIntent, PaymentMethod};
use crate::provider::{PaypalLinks, SessionEndpoint};
use crate::request::{GroupTarget, PurchaseKind, PurchaseRequest};

/// Body and endpoint of the Stripe session-creation call
#[derive(Clone, Debug, PartialEq)]
pub struct StripeSessionRequest {
    pub endpoint: SessionEndpoint,
    pub body: Value,
}

/// Intent plus the page to open for a PayPal purchase
#[derive(Clone, Debug, PartialEq)]
pub struct PaypalRedirect {
    pub intent: PaymentIntent,
    pub url: String,
}

/// Derives intents and provider targets
pub struct IntentBuilder;

impl IntentBuilder {
    /// Normalized payload for the Stripe session-creation call
    pub fn stripe_session(request: &PurchaseRequest) -> StripeSessionRequest {
        let mut body = Map::new();
        let mut endpoint = SessionEndpoint::CheckoutSession;

        match &request.kind {
            PurchaseKind::Sku(sku) => {
                body.insert("sku".into(), json!(sku));
            }
            PurchaseKind::GiftGems(gift) | PurchaseKind::GiftSubscription(gift) => {
                body.insert("gift".into(), json!(gift));
            }
            PurchaseKind::GroupPlan {
                subscription,
                target,
            } => {
                if let Some(key) = subscription {
                    body.insert("sub".into(), json!(key));
                }
                if let GroupTarget::Create(to_create) = target {
                    endpoint = SessionEndpoint::CreateGroupPlan;
                    body.insert("groupToCreate".into(), to_create.clone());
                    body.insert("paymentType".into(), json!("Stripe"));
                }
            }
            PurchaseKind::Subscription(key) => {
                body.insert("sub".into(), json!(key));
            }
            PurchaseKind::Gems(block) => {
                body.insert("gemsBlock".into(), json!(block.key));
            }
        }

        if let Some(coupon) = &request.coupon {
            body.insert("coupon".into(), json!(coupon));
        }
        if let Some(group_id) = &request.group_id {
            body.insert("groupId".into(), json!(group_id));
        }
        if let Some(demographics) = &request.demographics {
            body.insert("demographics".into(), demographics.clone());
        }

        StripeSessionRequest {
            endpoint,
            body: Value::Object(body),
        }
    }

    /// Intent for a Stripe checkout.
    ///
    /// `created_group` is the group returned by the plan-creation endpoint;
    /// `logged_in` is false when the purchase doubles as a sign-up.
    pub fn stripe_intent(
        request: &PurchaseRequest,
        created_group: Option<&Group>,
        logged_in: bool,
    ) -> PaymentIntent {
        let kind = match &request.kind {
            PurchaseKind::GroupPlan {
                subscription,
                target,
            } => {
                let (new_group, group) = match target {
                    GroupTarget::Create(_) => (true, created_group.map(Group::summary)),
                    GroupTarget::Existing(existing) => (false, Some(existing.summary())),
                };
                IntentKind::GroupPlan {
                    subscription_key: subscription.clone(),
                    new_signup: !logged_in,
                    new_group: Some(new_group),
                    group,
                    group_id: request.group_id.clone(),
                }
            }
            _ => Self::common_kind(request),
        };

        PaymentIntent::new(PaymentMethod::Stripe, kind)
    }

    /// Intent and link for a PayPal checkout.
    ///
    /// PayPal has no group plan flow.
    pub fn paypal(request: &PurchaseRequest) -> Result<PaypalRedirect> {
        let url = match &request.kind {
            PurchaseKind::Sku(sku) => PaypalLinks::sku(sku),
            PurchaseKind::GiftGems(gift) | PurchaseKind::GiftSubscription(gift) => {
                PaypalLinks::gift(gift)?
            }
            PurchaseKind::Subscription(key) => {
                PaypalLinks::subscribe(Some(key), request.coupon.as_deref())
            }
            PurchaseKind::Gems(block) => PaypalLinks::gems(block),
            PurchaseKind::GroupPlan { .. } => {
                return Err(PaymentError::Unsupported(
                    "group plans cannot be paid with PayPal".into(),
                ));
            }
        };

        Ok(PaypalRedirect {
            intent: PaymentIntent::new(PaymentMethod::Paypal, Self::common_kind(request)),
            url,
        })
    }

    /// Intent for the "update payment details" flow
    pub fn stripe_edit_intent(group_id: Option<String>) -> PaymentIntent {
        let kind = if group_id.is_some() {
            IntentKind::GroupPlan {
                subscription_key: None,
                new_signup: false,
                new_group: None,
                group: None,
                group_id,
            }
        } else {
            IntentKind::Subscription {
                subscription_key: None,
                group_id: None,
            }
        };

        let mut intent = PaymentIntent::new(PaymentMethod::Stripe, kind);
        intent.is_stripe_edit = true;
        intent
    }

    /// Provider-independent part of the intent
    fn common_kind(request: &PurchaseRequest) -> IntentKind {
        match &request.kind {
            PurchaseKind::Sku(sku) => IntentKind::Sku { sku: sku.clone() },
            PurchaseKind::GiftGems(gift) => IntentKind::GiftGems {
                gift: gift.clone(),
                gift_receiver: request.receiver_name.clone(),
            },
            PurchaseKind::GiftSubscription(gift) => IntentKind::GiftSubscription {
                gift: gift.clone(),
                gift_receiver: request.receiver_name.clone(),
            },
            PurchaseKind::GroupPlan { subscription, .. } => IntentKind::GroupPlan {
                subscription_key: subscription.clone(),
                new_signup: false,
                new_group: None,
                group: None,
                group_id: request.group_id.clone(),
            },
            PurchaseKind::Subscription(key) => IntentKind::Subscription {
                subscription_key: Some(key.clone()),
                group_id: None,
            },
            PurchaseKind::Gems(block) => IntentKind::Gems {
                gems_block: block.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::PaymentType;
    use crate::request::PurchaseOptions;

    fn classify(value: Value) -> PurchaseRequest {
        let options: PurchaseOptions = serde_json::from_value(value).unwrap();
        PurchaseRequest::classify(options).unwrap()
    }

    #[test]
    fn test_subscription_session_and_intent() {
        let request = classify(json!({ "subscription": "basic_3mo", "coupon": "WELCOME" }));

        let session = IntentBuilder::stripe_session(&request);
        assert_eq!(session.endpoint, SessionEndpoint::CheckoutSession);
        assert_eq!(session.body, json!({ "sub": "basic_3mo", "coupon": "WELCOME" }));

        let intent = IntentBuilder::stripe_intent(&request, None, true);
        assert_eq!(
            serde_json::to_value(&intent).unwrap(),
            json!({
                "paymentMethod": "stripe",
                "paymentCompleted": false,
                "paymentType": "subscription",
                "subscriptionKey": "basic_3mo",
            })
        );
    }

    #[test]
    fn test_group_creation_targets_plan_endpoint() {
        let request = classify(json!({
            "subscription": "group_monthly",
            "groupToCreate": { "name": "Fresh Party", "type": "guild", "privacy": "private" },
            "demographics": "sole_proprietor",
        }));

        let session = IntentBuilder::stripe_session(&request);
        assert_eq!(session.endpoint, SessionEndpoint::CreateGroupPlan);
        assert_eq!(session.body["paymentType"], json!("Stripe"));
        assert_eq!(session.body["groupToCreate"]["name"], json!("Fresh Party"));
        assert_eq!(session.body["demographics"], json!("sole_proprietor"));

        let created: Group = serde_json::from_value(json!({
            "_id": "group-new",
            "name": "Fresh Party",
            "type": "guild",
            "memberCount": 1,
            "leader": "user-1",
        }))
        .unwrap();

        let intent = IntentBuilder::stripe_intent(&request, Some(&created), false);
        let IntentKind::GroupPlan {
            new_signup,
            new_group,
            group,
            subscription_key,
            ..
        } = intent.kind
        else {
            panic!("expected group plan");
        };
        assert!(new_signup);
        assert_eq!(new_group, Some(true));
        assert_eq!(subscription_key.as_deref(), Some("group_monthly"));
        assert_eq!(group.unwrap().id.as_deref(), Some("group-new"));
    }

    #[test]
    fn test_group_upgrade_projects_existing_group() {
        let request = classify(json!({
            "subscription": "group_monthly",
            "groupId": "group-1",
            "group": { "_id": "group-1", "name": "Owls", "type": "party", "memberCount": 3, "quest": {} },
        }));

        let intent = IntentBuilder::stripe_intent(&request, None, true);
        assert_eq!(
            serde_json::to_value(&intent).unwrap(),
            json!({
                "paymentMethod": "stripe",
                "paymentCompleted": false,
                "paymentType": "groupPlan",
                "subscriptionKey": "group_monthly",
                "newGroup": false,
                "group": { "_id": "group-1", "name": "Owls", "type": "party", "memberCount": 3 },
                "groupId": "group-1",
            })
        );
    }

    #[test]
    fn test_paypal_gift_carries_receiver() {
        let request = classify(json!({
            "giftedTo": "receiver-1",
            "receiverName": "Wren",
            "gift": { "type": "subscription", "subscription": { "key": "basic_6mo" }, "message": "hi" },
        }));

        let redirect = IntentBuilder::paypal(&request).unwrap();
        assert!(redirect.url.starts_with("/paypal/checkout?gift="));
        assert_eq!(redirect.intent.payment_method, PaymentMethod::Paypal);
        assert_eq!(redirect.intent.payment_type(), PaymentType::GiftSubscription);

        let IntentKind::GiftSubscription { gift, gift_receiver } = redirect.intent.kind else {
            panic!("expected gift subscription");
        };
        assert_eq!(gift.uuid.as_deref(), Some("receiver-1"));
        assert_eq!(gift.extra["message"], json!("hi"));
        assert_eq!(gift_receiver.as_deref(), Some("Wren"));
    }

    #[test]
    fn test_paypal_gems_and_sku_links() {
        let gems = classify(json!({ "gemsBlock": { "key": "42gems", "gems": 42 } }));
        assert_eq!(
            IntentBuilder::paypal(&gems).unwrap().url,
            "/paypal/checkout?gemsBlock=42gems"
        );

        let sku = classify(json!({ "sku": "Pet-Gryphatrice-Jubilant" }));
        let redirect = IntentBuilder::paypal(&sku).unwrap();
        assert_eq!(redirect.url, "/paypal/checkout?sku=Pet-Gryphatrice-Jubilant");
        assert_eq!(
            redirect.intent.kind,
            IntentKind::Sku {
                sku: "Pet-Gryphatrice-Jubilant".into()
            }
        );
    }

    #[test]
    fn test_paypal_rejects_group_plans() {
        let request = classify(json!({ "group": { "_id": "group-1" } }));
        assert!(matches!(
            IntentBuilder::paypal(&request),
            Err(PaymentError::Unsupported(_))
        ));
    }

    #[test]
    fn test_edit_intent_shape() {
        let intent = IntentBuilder::stripe_edit_intent(Some("group-1".into()));
        assert_eq!(
            serde_json::to_value(&intent).unwrap(),
            json!({
                "paymentMethod": "stripe",
                "paymentCompleted": false,
                "isStripeEdit": true,
                "paymentType": "groupPlan",
                "groupId": "group-1",
            })
        );

        let personal = IntentBuilder::stripe_edit_intent(None);
        assert_eq!(personal.payment_type(), PaymentType::Subscription);
        assert!(personal.is_stripe_edit);
    }
}
