//! Browser-side collaborators
//!
//! The page itself (navigation, alerts, the hosted checkout overlay, the
//! app-wide event bus) sits behind these traits so flows can run outside a
//! browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// How a completed checkout reloads the page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Plain reload
    Standard,
    /// Cache-bypassing reload
    #[default]
    Forced,
}

/// Page navigation
pub trait Navigator: Send + Sync {
    /// Open `url` in `target` (e.g. `_blank`)
    fn open(&self, url: &str, target: &str) -> Result<()>;

    /// Reload the current page
    fn reload(&self, policy: ReloadPolicy) -> Result<()>;
}

/// Provider-hosted checkout overlay (Stripe Checkout)
#[async_trait]
pub trait HostedCheckout: Send + Sync {
    /// Hand the user over to the hosted page for `session_id`.
    ///
    /// Success means the handover happened; completion is reported through
    /// the shared store, never here.
    async fn redirect_to_checkout(&self, session_id: &str) -> Result<()>;
}

/// Events broadcast to the rest of the app
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AppEvent {
    /// Ask the UI to confirm a cancellation
    CancelSubscriptionConfirm {
        #[serde(skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },

    /// An individual subscription was cancelled
    SubscriptionCanceled {
        date_terminated: Option<String>,
        is_group: bool,
    },

    /// Analytics hit after handing a new group plan to Stripe
    GroupPlanCreated {
        #[serde(skip_serializing_if = "Option::is_none")]
        demographics: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        group_type: Option<String>,
    },
}

/// User-facing feedback
pub trait Notifier: Send + Sync {
    /// Blocking alert
    fn alert(&self, message: &str);

    /// Inline error next to the form
    fn error(&self, message: &str);

    /// Broadcast an app event
    fn emit(&self, event: AppEvent);
}
