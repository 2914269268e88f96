//! Cross-context checkout simulation
//!
//! Runs a purchase in one browsing context of a [`MemoryStore`] and plays the
//! provider callback page in a second one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use questpay_core::{
    Account, BackendApi, CheckoutConfig, CheckoutSession, Collaborators, Group, IntentSlot,
    MemoryStore, Payments, PurchaseOptions, Result, WatchOutcome,
};
use questpay_runtime::{ConsoleNavigator, ConsoleNotifier, Navigation, SimulatedCheckout};
use serde_json::Value;

/// Backend that hands out numbered sessions
#[derive(Default)]
pub struct SimulatedBackend {
    sessions: AtomicU32,
}

impl SimulatedBackend {
    fn next_session(&self, group: Option<Group>) -> CheckoutSession {
        let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let session_id = format!("cs_sim_{n}");
        tracing::debug!(session_id = %session_id, "Simulated session");
        CheckoutSession { session_id, group }
    }
}

#[async_trait]
impl BackendApi for SimulatedBackend {
    async fn create_checkout_session(&self, _body: &Value) -> Result<CheckoutSession> {
        Ok(self.next_session(None))
    }

    async fn create_group_plan(&self, body: &Value) -> Result<CheckoutSession> {
        let mut group: Group = match body.get("groupToCreate") {
            Some(to_create) => serde_json::from_value(to_create.clone())?,
            None => Group::default(),
        };
        group.id = Some("group-sim".into());
        Ok(self.next_session(Some(group)))
    }

    async fn edit_checkout_session(&self, _group_id: Option<&str>) -> Result<CheckoutSession> {
        Ok(self.next_session(None))
    }

    async fn cancel_subscription(&self, _payment_method: &str, _group_id: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn fetch_account(&self) -> Result<Account> {
        Ok(Account::default())
    }
}

/// Which provider the simulated purchase goes through
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    Paypal,
    Stripe,
}

/// Result of one simulated handshake
#[derive(Debug)]
pub struct SimulationReport {
    pub outcome: WatchOutcome,
    pub reloads: usize,
    pub opened: Vec<String>,
}

/// Purchase in the page context, then write from the callback context.
///
/// With `complete` the callback marks the stored intent completed; without
/// it the callback clears the slot, which the watcher ignores.
pub async fn run(
    options: PurchaseOptions,
    provider: Provider,
    complete: bool,
    config: CheckoutConfig,
) -> Result<SimulationReport> {
    let page = MemoryStore::new();
    let callback = page.open_context();
    let navigator = Arc::new(ConsoleNavigator::new());

    let payments = Payments::new(
        Collaborators {
            store: Arc::new(page),
            backend: Arc::new(SimulatedBackend::default()),
            checkout: Arc::new(SimulatedCheckout::default()),
            navigator: navigator.clone(),
            notifier: Arc::new(ConsoleNotifier),
        },
        config,
    );

    let mut watcher = match provider {
        Provider::Paypal => payments.open_paypal(options)?,
        Provider::Stripe => payments.redirect_to_stripe(options).await?,
    };

    let callback_slot = IntentSlot::with_key(Arc::new(callback), payments.slot().key());
    if complete {
        let marked = callback_slot.mark_completed()?;
        tracing::info!(marked, "Callback page recorded completion");
    } else {
        callback_slot.clear()?;
        tracing::info!("Callback page cleared the slot");
    }

    let outcome = watcher.wait(navigator.as_ref()).await?;

    Ok(SimulationReport {
        outcome,
        reloads: navigator.reloads(),
        opened: navigator
            .history()
            .into_iter()
            .filter_map(|n| match n {
                Navigation::Open { url, .. } => Some(url),
                Navigation::Reload(_) => None,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use questpay_core::PaymentType;

    fn options(json: &str) -> PurchaseOptions {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_paypal_completion_reloads() {
        let report = run(
            options(r#"{"gemsBlock":{"key":"21gems","gems":21}}"#),
            Provider::Paypal,
            true,
            CheckoutConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.reloads, 1);
        assert_eq!(report.opened, vec!["/paypal/checkout?gemsBlock=21gems".to_string()]);
        match report.outcome {
            WatchOutcome::Completed(intent) => {
                assert_eq!(intent.payment_type(), PaymentType::Gems);
                assert!(intent.payment_completed);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cleared_slot_is_ignored() {
        let report = run(
            options(r#"{"subscription":"basic_3mo"}"#),
            Provider::Stripe,
            false,
            CheckoutConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.reloads, 0);
        assert_eq!(report.outcome, WatchOutcome::Ignored(None));
    }

    #[tokio::test]
    async fn test_stripe_group_creation_completes() {
        let report = run(
            options(r#"{"subscription":"group_monthly","groupToCreate":{"name":"Party","type":"guild"}}"#),
            Provider::Stripe,
            true,
            CheckoutConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.reloads, 1);
        assert!(report.opened.is_empty());
    }
}
