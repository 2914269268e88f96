//! Console collaborators
//!
//! Stand-ins for the browser page when flows run from a terminal: every
//! navigation, alert and event is logged, and navigations are recorded so
//! callers can report what would have happened.

use std::sync::Mutex;

use async_trait::async_trait;
use questpay_core::{
    AppEvent, HostedCheckout, Navigator, Notifier, PaymentError, ReloadPolicy, Result,
};

/// A navigation that would have happened in the browser
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Open { url: String, target: String },
    Reload(ReloadPolicy),
}

/// Logs and records navigations
#[derive(Default)]
pub struct ConsoleNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl ConsoleNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn reloads(&self) -> usize {
        self.history()
            .iter()
            .filter(|n| matches!(n, Navigation::Reload(_)))
            .count()
    }

    fn record(&self, navigation: Navigation) -> Result<()> {
        self.history
            .lock()
            .map_err(|e| PaymentError::Storage(e.to_string()))?
            .push(navigation);
        Ok(())
    }
}

impl Navigator for ConsoleNavigator {
    fn open(&self, url: &str, target: &str) -> Result<()> {
        tracing::info!(url, target, "Opening provider page");
        self.record(Navigation::Open {
            url: url.to_string(),
            target: target.to_string(),
        })
    }

    fn reload(&self, policy: ReloadPolicy) -> Result<()> {
        tracing::info!(policy = ?policy, "Reloading page");
        self.record(Navigation::Reload(policy))
    }
}

/// Writes alerts, inline errors and app events to the log
#[derive(Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        tracing::warn!(message, "Alert");
    }

    fn error(&self, message: &str) {
        tracing::warn!(message, "Form error");
    }

    fn emit(&self, event: AppEvent) {
        match serde_json::to_string(&event) {
            Ok(encoded) => tracing::info!(event = %encoded, "App event"),
            Err(err) => tracing::warn!(error = %err, "Unencodable app event"),
        }
    }
}

/// Hosted checkout that only logs the handover.
///
/// `failing` simulates the overlay refusing the session.
#[derive(Default)]
pub struct SimulatedCheckout {
    failure: Option<String>,
}

impl SimulatedCheckout {
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl HostedCheckout for SimulatedCheckout {
    async fn redirect_to_checkout(&self, session_id: &str) -> Result<()> {
        tracing::info!(session_id, "Handing over to hosted checkout");
        match &self.failure {
            Some(message) => Err(PaymentError::Checkout {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigator_records_history() {
        let navigator = ConsoleNavigator::new();
        navigator.open("/paypal/checkout", "_blank").unwrap();
        navigator.reload(ReloadPolicy::Forced).unwrap();

        assert_eq!(navigator.reloads(), 1);
        assert_eq!(
            navigator.history()[0],
            Navigation::Open {
                url: "/paypal/checkout".into(),
                target: "_blank".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_failing_checkout() {
        let checkout = SimulatedCheckout::failing("card declined");
        let err = checkout.redirect_to_checkout("cs_1").await.unwrap_err();
        assert!(matches!(err, PaymentError::Checkout { .. }));
    }
}
