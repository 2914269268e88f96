//! Subscription cancellation
//!
//! One request to the provider's cancel endpoint. Individual cancellations
//! refresh the account and announce the termination date; group
//! cancellations leave a marker in the shared store and reload. Failures
//! show the server's message and are returned as-is: no retry, no rollback.

use serde::{Deserialize, Serialize};

use crate::account::Group;
use crate::browser::AppEvent;
use crate::checkout::Payments;
use crate::error::{PaymentError, Result};
use crate::intent::SavedAppState;

/// What the cancel button hands over
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelConfig {
    /// Cancel this group's plan instead of the user's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_cancel: Option<bool>,
}

/// How a successful cancellation finished
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Account reloaded; the plan ends on `date_terminated`
    AccountRefreshed { date_terminated: Option<String> },
    /// Marker stored and page reloaded
    GroupReloaded,
}

impl Payments {
    /// Ask the UI to confirm a cancellation. Returns `false` when the plan
    /// cannot be cancelled and nothing was emitted.
    pub fn cancel_subscription_confirm(&self, config: &CancelConfig) -> bool {
        if config.can_cancel == Some(false) {
            return false;
        }

        self.deps.notifier.emit(AppEvent::CancelSubscriptionConfirm {
            group_id: config.group.as_ref().and_then(|g| g.id.clone()),
        });
        true
    }

    /// Cancel the user's or a group's subscription
    pub async fn cancel_subscription(&self, config: &CancelConfig) -> Result<CancelOutcome> {
        match self.try_cancel(config).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(error = %err, "Subscription cancellation failed");
                self.deps.notifier.alert(&err.user_message());
                Err(err)
            }
        }
    }

    async fn try_cancel(&self, config: &CancelConfig) -> Result<CancelOutcome> {
        let payment_method = match &config.group {
            Some(group) => group.purchased.plan.payment_method.clone(),
            None => self
                .account()?
                .and_then(|account| account.purchased.plan.payment_method),
        }
        .ok_or(PaymentError::MissingPaymentMethod)?;

        let group_id = config.group.as_ref().and_then(|g| g.id.as_deref());

        self.deps
            .backend
            .cancel_subscription(&payment_method, group_id)
            .await?;

        tracing::info!(
            payment_method = %payment_method,
            group_id = ?group_id,
            "Subscription cancelled"
        );

        if config.group.is_some() {
            self.slot.write(&SavedAppState::group_plan_canceled())?;
            self.deps.navigator.reload(self.config.reload_policy)?;
            return Ok(CancelOutcome::GroupReloaded);
        }

        let account = self.deps.backend.fetch_account().await?;
        let date_terminated = account.date_terminated();
        self.set_account(Some(account))?;

        self.deps.notifier.emit(AppEvent::SubscriptionCanceled {
            date_terminated: date_terminated.clone(),
            is_group: false,
        });

        Ok(CancelOutcome::AccountRefreshed { date_terminated })
    }
}
