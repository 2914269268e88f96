//! # questpay-core
//!
//! Client-side checkout coordination for questpay: turning a purchase into a
//! stored payment intent, handing the user to Stripe or PayPal, and noticing
//! when the provider callback page marks the payment completed.
//!
//! ## Checkout Handshake
//!
//! ```text
//! ┌──────────────┐ write  ┌──────────────┐  change  ┌──────────────────┐
//! │    Intent    │───────▶│ Shared Store │─────────▶│    Completion    │
//! │   Builder    │        │ (one slot)   │          │    Watcher       │
//! └──────┬───────┘        └──────▲───────┘          └────────┬─────────┘
//!        │ open / overlay        │ paymentCompleted           │ reload
//!        ▼                       │                            ▼
//! ┌──────────────┐        ┌──────┴───────┐            ┌──────────────┐
//! │   Provider   │───────▶│ Callback tab │            │  Navigator   │
//! └──────────────┘        └──────────────┘            └──────────────┘
//! ```
//!
//! The intent is written exactly once and the watcher is armed before the
//! provider is opened, so a completion cannot slip past it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use questpay_core::{CheckoutConfig, Collaborators, Payments, PurchaseOptions};
//!
//! let payments = Payments::new(collaborators, CheckoutConfig::from_env()?);
//!
//! let options: PurchaseOptions = serde_json::from_str(r#"{"subscription":"basic_3mo"}"#)?;
//! let mut watcher = payments.redirect_to_stripe(options).await?;
//!
//! // Resolves once another tab records the completion.
//! watcher.wait(navigator.as_ref()).await?;
//! ```

mod account;
mod backend;
mod browser;
mod builder;
mod cancel;
mod checkout;
mod config;
mod error;
mod intent;
mod provider;
mod request;
mod store;
mod watcher;

pub use account::{Account, Group, Preferences, Purchased, SubscriptionPlan, format_date};
pub use backend::{ApiErrorBody, BackendApi, CheckoutSession, Envelope};
pub use browser::{AppEvent, HostedCheckout, Navigator, Notifier, ReloadPolicy};
pub use builder::{IntentBuilder, PaypalRedirect, StripeSessionRequest};
pub use cancel::{CancelConfig, CancelOutcome};
pub use checkout::{Collaborators, GROUP_PLAN_SUBSCRIPTION, Payments};
pub use config::CheckoutConfig;
pub use error::{PaymentError, Result};
pub use intent::{
    GemsBlock, GemsGift, GiftKind, GiftPayload, GroupPlanCanceled, GroupSummary, IntentKind,
    PaymentIntent, PaymentMethod, PaymentType, SAVED_APP_STATE, SavedAppState, SubscriptionGift,
};
pub use provider::{
    DEFAULT_PAYPAL_SUBSCRIPTION, GROUP_CREATE_PLAN_PATH, NEW_WINDOW, PAYPAL_CHECKOUT_PATH,
    PAYPAL_SUBSCRIBE_PATH, PaypalLinks, STRIPE_CHECKOUT_SESSION_PATH, STRIPE_EDIT_PATH,
    SessionEndpoint, cancel_path,
};
pub use request::{
    GroupTarget, PRECEDENCE, PurchaseKind, PurchaseOptions, PurchaseRequest, check_gem_amount,
};
pub use store::{
    ContextId, DEFAULT_EVENT_CAPACITY, IntentSlot, MemoryStore, SharedStore, StoreEvent,
    Subscription,
};
pub use watcher::{CompletionWatcher, WatchOutcome, WatcherState};
