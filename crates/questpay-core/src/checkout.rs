//! Checkout flows
//!
//! Every flow follows the same order: derive the intent, write it to the
//! shared store exactly once, arm the completion watcher, and only then
//! hand the user to the provider. A completion can therefore never be
//! written before the watcher exists to see it.

use std::sync::{Arc, RwLock};

use crate::account::{Account, Group};
use crate::backend::{BackendApi, CheckoutSession};
use crate::browser::{AppEvent, HostedCheckout, Navigator, Notifier};
use crate::builder::IntentBuilder;
use crate::config::CheckoutConfig;
use crate::error::{PaymentError, Result};
use crate::intent::{GiftPayload, PaymentIntent, SavedAppState};
use crate::provider::{NEW_WINDOW, SessionEndpoint};
use crate::request::{PurchaseKind, PurchaseOptions, PurchaseRequest};
use crate::store::{IntentSlot, SharedStore};
use crate::watcher::CompletionWatcher;

/// Subscription key used for group plans
pub const GROUP_PLAN_SUBSCRIPTION: &str = "group_monthly";

/// Everything checkout talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SharedStore>,
    pub backend: Arc<dyn BackendApi>,
    pub checkout: Arc<dyn HostedCheckout>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Checkout and cancellation for one browsing context
pub struct Payments {
    pub(crate) deps: Collaborators,
    pub(crate) config: CheckoutConfig,
    pub(crate) slot: IntentSlot,
    account: RwLock<Option<Account>>,
}

impl Payments {
    pub fn new(deps: Collaborators, config: CheckoutConfig) -> Self {
        let slot = IntentSlot::with_key(Arc::clone(&deps.store), config.state_key.clone());
        Self {
            deps,
            config,
            slot,
            account: RwLock::new(None),
        }
    }

    /// Set the signed-in user; `None` means the visitor is signing up
    pub fn set_account(&self, account: Option<Account>) -> Result<()> {
        let mut current = self
            .account
            .write()
            .map_err(|e| PaymentError::Storage(e.to_string()))?;
        *current = account;
        Ok(())
    }

    pub fn account(&self) -> Result<Option<Account>> {
        let current = self
            .account
            .read()
            .map_err(|e| PaymentError::Storage(e.to_string()))?;
        Ok(current.clone())
    }

    pub fn slot(&self) -> &IntentSlot {
        &self.slot
    }

    /// Start a PayPal checkout in a new window
    pub fn open_paypal(&self, options: PurchaseOptions) -> Result<CompletionWatcher> {
        let request = self.classify(options)?;
        let redirect = IntentBuilder::paypal(&request)?;

        let watcher = self.save_and_arm(redirect.intent)?;
        self.deps.navigator.open(&redirect.url, NEW_WINDOW)?;

        Ok(watcher)
    }

    /// Start a PayPal checkout for a gift
    pub fn open_paypal_gift(
        &self,
        gifted_to: impl Into<String>,
        receiver_name: Option<String>,
        gift: GiftPayload,
    ) -> Result<CompletionWatcher> {
        self.open_paypal(PurchaseOptions {
            uuid: Some(gifted_to.into()),
            receiver_name,
            gift: Some(gift),
            ..PurchaseOptions::default()
        })
    }

    /// Start a Stripe hosted checkout.
    ///
    /// Rejected requests never reach the backend. Overlay failures are
    /// alerted and returned.
    pub async fn redirect_to_stripe(&self, options: PurchaseOptions) -> Result<CompletionWatcher> {
        let request = self.classify(options)?;
        let session_request = IntentBuilder::stripe_session(&request);

        let session = match session_request.endpoint {
            SessionEndpoint::CheckoutSession => {
                self.deps
                    .backend
                    .create_checkout_session(&session_request.body)
                    .await?
            }
            SessionEndpoint::CreateGroupPlan => {
                self.deps
                    .backend
                    .create_group_plan(&session_request.body)
                    .await?
            }
        };
        tracing::debug!(session_id = %session.session_id, "Stripe session created");

        let logged_in = self.account()?.is_some();
        let intent = IntentBuilder::stripe_intent(&request, session.group.as_ref(), logged_in);

        let watcher = self.save_and_arm(intent)?;
        self.open_hosted_checkout(&session).await?;

        if let PurchaseKind::GroupPlan { .. } = request.kind {
            self.deps.notifier.emit(AppEvent::GroupPlanCreated {
                demographics: request.demographics.clone(),
                group_type: session.group.as_ref().and_then(|g| g.kind.clone()),
            });
        }

        Ok(watcher)
    }

    /// Send the user to Stripe to update payment details of an existing
    /// subscription (the group's when `group_id` is set)
    pub async fn redirect_to_stripe_edit(
        &self,
        group_id: Option<String>,
    ) -> Result<CompletionWatcher> {
        let intent = IntentBuilder::stripe_edit_intent(group_id.clone());
        let session = self
            .deps
            .backend
            .edit_checkout_session(group_id.as_deref())
            .await?;

        let watcher = self.save_and_arm(intent)?;
        self.open_hosted_checkout(&session).await?;
        Ok(watcher)
    }

    /// Buy a group plan: upgrade `group` when `upgrade` is set and it has an
    /// id, otherwise create it
    pub async fn stripe_group(&self, group: Group, upgrade: bool) -> Result<CompletionWatcher> {
        let mut options = PurchaseOptions {
            subscription: Some(GROUP_PLAN_SUBSCRIPTION.into()),
            ..PurchaseOptions::default()
        };

        match group.id.clone() {
            Some(id) if upgrade => {
                options.group_id = Some(id);
                options.group = Some(group);
            }
            _ => {
                options.group_to_create = Some(serde_json::to_value(&group)?);
            }
        }

        self.redirect_to_stripe(options).await
    }

    fn classify(&self, options: PurchaseOptions) -> Result<PurchaseRequest> {
        PurchaseRequest::classify(options).inspect_err(|err| {
            if matches!(
                err,
                PaymentError::InvalidGemAmount | PaymentError::InvalidGift(_)
            ) {
                self.deps.notifier.error(&err.user_message());
            }
        })
    }

    /// The one write before leaving, then the watcher
    fn save_and_arm(&self, intent: PaymentIntent) -> Result<CompletionWatcher> {
        tracing::info!(
            payment_type = %intent.payment_type(),
            payment_method = %intent.payment_method,
            "Saving payment intent"
        );
        self.slot.write(&SavedAppState::Payment(intent))?;

        Ok(CompletionWatcher::arm_on(
            self.deps.store.as_ref(),
            self.slot.key(),
            self.config.reload_policy,
        ))
    }

    async fn open_hosted_checkout(&self, session: &CheckoutSession) -> Result<()> {
        match self
            .deps
            .checkout
            .redirect_to_checkout(&session.session_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(
                    session_id = %session.session_id,
                    error = %err,
                    "Error while redirecting to Stripe"
                );
                let message = match &err {
                    PaymentError::Checkout { message } => message.clone(),
                    other => other.to_string(),
                };
                self.deps
                    .notifier
                    .alert(&format!("Error while redirecting to Stripe: {message}"));
                Err(err)
            }
        }
    }
}
