//! Purchase requests
//!
//! [`PurchaseOptions`] is the loose shape the UI hands over. It is turned into
//! a [`PurchaseRequest`] by one ordered match, so the precedence between the
//! purchase kinds is the table in [`PRECEDENCE`] and nothing else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::Group;
use crate::error::{PaymentError, Result};
use crate::intent::{GemsBlock, GiftKind, GiftPayload, PaymentType};

/// Order in which purchase kinds are recognized; first match wins
pub const PRECEDENCE: [PaymentType; 6] = [
    PaymentType::Sku,
    PaymentType::GiftGems,
    PaymentType::GiftSubscription,
    PaymentType::GroupPlan,
    PaymentType::Subscription,
    PaymentType::Gems,
];

/// Loosely-typed purchase options
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOptions {
    /// Subscription tier key, e.g. `basic_3mo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift: Option<GiftPayload>,

    /// Gift receiver id
    #[serde(default, alias = "giftedTo", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Gift receiver display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems_block: Option<GemsBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Existing group being upgraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,

    /// Group to create along with its plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_to_create: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<Value>,
}

/// Group plan target
#[derive(Clone, Debug, PartialEq)]
pub enum GroupTarget {
    /// Upgrade a group that already exists
    Existing(Group),
    /// Create the group as part of checkout
    Create(Value),
}

/// Purchase kind with exactly the data it needs
#[derive(Clone, Debug, PartialEq)]
pub enum PurchaseKind {
    Sku(String),
    GiftGems(GiftPayload),
    GiftSubscription(GiftPayload),
    GroupPlan {
        subscription: Option<String>,
        target: GroupTarget,
    },
    Subscription(String),
    Gems(GemsBlock),
}

impl PurchaseKind {
    pub const fn payment_type(&self) -> PaymentType {
        match self {
            Self::Sku(_) => PaymentType::Sku,
            Self::GiftGems(_) => PaymentType::GiftGems,
            Self::GiftSubscription(_) => PaymentType::GiftSubscription,
            Self::GroupPlan { .. } => PaymentType::GroupPlan,
            Self::Subscription(_) => PaymentType::Subscription,
            Self::Gems(_) => PaymentType::Gems,
        }
    }
}

/// A validated purchase request
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseRequest {
    pub kind: PurchaseKind,
    pub receiver_name: Option<String>,
    pub group_id: Option<String>,
    pub coupon: Option<String>,
    pub demographics: Option<Value>,
}

impl PurchaseRequest {
    /// Validate and classify loose options.
    ///
    /// Fails with [`PaymentError::InvalidGemAmount`] for a gift of gems with
    /// no amount, or a gem purchase without a usable gems block.
    pub fn classify(options: PurchaseOptions) -> Result<Self> {
        check_gem_amount(&options)?;

        let PurchaseOptions {
            subscription,
            gift,
            uuid,
            receiver_name,
            gems_block,
            sku,
            group,
            group_to_create,
            group_id,
            coupon,
            demographics,
        } = options;

        let target = match (group, group_to_create) {
            (_, Some(to_create)) => Some(GroupTarget::Create(to_create)),
            (Some(existing), None) => Some(GroupTarget::Existing(existing)),
            (None, None) => None,
        };

        let kind = match (sku, gift, target, subscription) {
            (Some(sku), ..) => PurchaseKind::Sku(sku),
            (None, Some(gift), ..) => {
                let gift = attach_receiver(gift, uuid)?;
                match gift.kind {
                    GiftKind::Gems => PurchaseKind::GiftGems(gift),
                    GiftKind::Subscription => PurchaseKind::GiftSubscription(gift),
                }
            }
            (None, None, Some(target), subscription) => PurchaseKind::GroupPlan {
                subscription,
                target,
            },
            (None, None, None, Some(key)) => PurchaseKind::Subscription(key),
            (None, None, None, None) => match gems_block {
                Some(block) if block.gems != Some(0) => PurchaseKind::Gems(block),
                _ => return Err(PaymentError::InvalidGemAmount),
            },
        };

        tracing::debug!(payment_type = %kind.payment_type(), "Classified purchase");

        Ok(Self {
            kind,
            receiver_name,
            group_id,
            coupon,
            demographics,
        })
    }

    pub const fn payment_type(&self) -> PaymentType {
        self.kind.payment_type()
    }
}

/// The single validation gate: a gift of gems needs a positive amount
pub fn check_gem_amount(options: &PurchaseOptions) -> Result<()> {
    match &options.gift {
        Some(gift) if gift.kind == GiftKind::Gems && gift.gem_amount() == 0 => {
            tracing::debug!("Rejected gift of gems without an amount");
            Err(PaymentError::InvalidGemAmount)
        }
        _ => Ok(()),
    }
}

fn attach_receiver(gift: GiftPayload, uuid: Option<String>) -> Result<GiftPayload> {
    let receiver = uuid
        .or_else(|| gift.uuid.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PaymentError::InvalidGift("missing receiver id".into()))?;
    Ok(gift.with_receiver(receiver))
}
