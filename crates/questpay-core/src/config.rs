//! Checkout configuration

use serde::{Deserialize, Serialize};

use crate::browser::ReloadPolicy;
use crate::error::{PaymentError, Result};
use crate::intent::SAVED_APP_STATE;

/// Checkout behavior settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Shared store key holding the saved app state
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Reload used once a completion is observed
    #[serde(default)]
    pub reload_policy: ReloadPolicy,
}

fn default_state_key() -> String {
    SAVED_APP_STATE.into()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            state_key: default_state_key(),
            reload_policy: ReloadPolicy::default(),
        }
    }
}

impl CheckoutConfig {
    /// Read `QUESTPAY_STATE_KEY` and `QUESTPAY_FORCE_RELOAD`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("QUESTPAY_STATE_KEY") {
            if key.trim().is_empty() {
                return Err(PaymentError::Config("QUESTPAY_STATE_KEY is empty".into()));
            }
            config.state_key = key;
        }

        if let Ok(force) = std::env::var("QUESTPAY_FORCE_RELOAD") {
            config.reload_policy = parse_reload_policy(&force)?;
        }

        Ok(config)
    }
}

fn parse_reload_policy(value: &str) -> Result<ReloadPolicy> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "forced" => Ok(ReloadPolicy::Forced),
        "0" | "false" | "no" | "standard" => Ok(ReloadPolicy::Standard),
        other => Err(PaymentError::Config(format!(
            "QUESTPAY_FORCE_RELOAD must be a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::default();
        assert_eq!(config.state_key, "saved-app-state");
        assert_eq!(config.reload_policy, ReloadPolicy::Forced);
    }

    #[test]
    fn test_reload_policy_parsing() {
        assert_eq!(parse_reload_policy("false").unwrap(), ReloadPolicy::Standard);
        assert_eq!(parse_reload_policy(" YES ").unwrap(), ReloadPolicy::Forced);
        assert!(parse_reload_policy("sometimes").is_err());
    }
}
