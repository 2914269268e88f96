//! Completion Watcher
//!
//! Armed right after an intent is saved. The first change to the slot made
//! by another context finishes it: the subscription is dropped, the value is
//! decoded, and a completed payment reloads the page. There is no timeout;
//! dropping the watcher is the only way to cancel it.

use crate::browser::{Navigator, ReloadPolicy};
use crate::error::{PaymentError, Result};
use crate::intent::{PaymentIntent, SAVED_APP_STATE, SavedAppState};
use crate::store::{SharedStore, StoreEvent, Subscription};

/// Watcher lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    /// Listening for store changes
    Armed,
    /// Detached after the first matching change
    Done,
}

/// What the matching change turned out to be
#[derive(Clone, Debug, PartialEq)]
pub enum WatchOutcome {
    /// Payment completed; the page was reloaded
    Completed(PaymentIntent),
    /// Anything else: a null value, a pending intent, another record, or an
    /// undecodable write. No action taken.
    Ignored(Option<SavedAppState>),
}

pub struct CompletionWatcher {
    key: String,
    policy: ReloadPolicy,
    state: WatcherState,
    subscription: Option<Subscription>,
}

impl CompletionWatcher {
    /// Arm on the saved app state slot
    pub fn arm(store: &dyn SharedStore, policy: ReloadPolicy) -> Self {
        Self::arm_on(store, SAVED_APP_STATE, policy)
    }

    /// Arm on a specific key
    pub fn arm_on(store: &dyn SharedStore, key: impl Into<String>, policy: ReloadPolicy) -> Self {
        let key = key.into();
        tracing::debug!(key = %key, context = %store.context(), "Completion watcher armed");
        Self {
            key,
            policy,
            state: WatcherState::Armed,
            subscription: Some(store.subscribe()),
        }
    }

    pub const fn state(&self) -> WatcherState {
        self.state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Feed one store event.
    ///
    /// Returns `None` for events that do not finish the watcher: other keys,
    /// and everything once it is done.
    pub fn observe(
        &mut self,
        event: &StoreEvent,
        navigator: &dyn Navigator,
    ) -> Result<Option<WatchOutcome>> {
        if self.state == WatcherState::Done || event.key != self.key {
            return Ok(None);
        }

        self.state = WatcherState::Done;
        self.subscription = None;

        let decoded = match event.new_value.as_deref().map(SavedAppState::decode) {
            Some(Ok(state)) => Some(state),
            Some(Err(err)) => {
                tracing::warn!(key = %self.key, error = %err, "Ignoring undecodable app state");
                None
            }
            None => None,
        };

        match decoded {
            Some(SavedAppState::Payment(intent)) if intent.payment_completed => {
                tracing::info!(
                    payment_type = %intent.payment_type(),
                    policy = ?self.policy,
                    "Payment completion observed, reloading"
                );
                navigator.reload(self.policy)?;
                Ok(Some(WatchOutcome::Completed(intent)))
            }
            other => {
                tracing::debug!(key = %self.key, "App state changed without completion");
                Ok(Some(WatchOutcome::Ignored(other)))
            }
        }
    }

    /// Wait for the matching change and handle it
    pub async fn wait(&mut self, navigator: &dyn Navigator) -> Result<WatchOutcome> {
        loop {
            let event = match self.subscription.as_mut() {
                Some(subscription) => subscription.recv().await?,
                None => return Err(PaymentError::ChannelClosed),
            };
            if let Some(outcome) = self.observe(&event, navigator)? {
                return Ok(outcome);
            }
        }
    }
}
