//! Account and group projections
//!
//! Only the parts of the user and group documents that checkout and
//! cancellation read.

use chrono::{DateTime, Months, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::intent::GroupSummary;

/// Subscription plan state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    /// Provider name as stored by the backend ("Stripe", "Paypal", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_terminated: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Purchased {
    #[serde(default)]
    pub plan: SubscriptionPlan,
}

impl Purchased {
    /// No plan information at all
    pub fn is_empty(&self) -> bool {
        self.plan == SubscriptionPlan::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// e.g. `MM/dd/yyyy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

/// The signed-in user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub purchased: Purchased,

    #[serde(default)]
    pub preferences: Preferences,
}

impl Account {
    /// Termination date rendered with the user's date preference
    pub fn date_terminated(&self) -> Option<String> {
        self.purchased
            .plan
            .date_terminated
            .map(|date| format_date(date, self.preferences.date_format.as_deref()))
    }

    /// Renewal date one month from `now`
    pub fn renewal_date(&self, now: DateTime<Utc>) -> String {
        let renewal = now.checked_add_months(Months::new(1)).unwrap_or(now);
        format_date(renewal, self.preferences.date_format.as_deref())
    }
}

/// A party/guild as passed to checkout and cancellation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Purchased::is_empty")]
    pub purchased: Purchased,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    /// The `_id`/`name`/`type`/`memberCount` projection stored in intents
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            member_count: self.member_count,
        }
    }
}

/// Format a date with a user preference such as `MM/dd/yyyy`.
///
/// The preference is upper-cased first (`MM/DD/YYYY`), so only the
/// year/month/day tokens are meaningful; everything else, `%` included, is
/// copied literally. Without a preference the ISO value is returned.
pub fn format_date(date: DateTime<Utc>, preference: Option<&str>) -> String {
    match preference {
        Some(pattern) if !pattern.is_empty() => {
            let chrono_pattern = pattern
                .to_uppercase()
                .replace('%', "%%")
                .replace("YYYY", "%Y")
                .replace("MM", "%m")
                .replace("DD", "%d");
            date.format(&chrono_pattern).to_string()
        }
        _ => date.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
