//! # questpay-runtime
//!
//! Runtime collaborators for questpay checkout.
//!
//! ## Providers
//!
//! - **HTTP backend**: `BackendApi` over the REST API with `reqwest`
//! - **Console**: navigator, notifier and hosted checkout stand-ins that log
//!   instead of touching a browser
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use questpay_runtime::{ConsoleNavigator, ConsoleNotifier, HttpBackend, SimulatedCheckout};
//!
//! let collaborators = Collaborators {
//!     store: Arc::new(MemoryStore::new()),
//!     backend: Arc::new(HttpBackend::from_env()?),
//!     checkout: Arc::new(SimulatedCheckout::default()),
//!     navigator: Arc::new(ConsoleNavigator::new()),
//!     notifier: Arc::new(ConsoleNotifier),
//! };
//! ```

pub mod console;
pub mod http;

pub use console::{ConsoleNavigator, ConsoleNotifier, Navigation, SimulatedCheckout};
pub use http::{HttpBackend, HttpBackendConfig, USER_PATH};

// Re-export core types for convenience
pub use questpay_core::{
    BackendApi, CheckoutConfig, Collaborators, MemoryStore, PaymentError, Payments, Result,
};
