//! Backend API seam
//!
//! The server endpoints checkout talks to. Implementations live in
//! `questpay-runtime`; tests use in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::{Account, Group};
use crate::error::Result;

/// Response envelope: `{ "data": ... }`
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Failure body: `{ "message": ... }`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// A Stripe session created by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,

    /// Present when the group was created along with its plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

/// Backend endpoints used by checkout and cancellation
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `POST /stripe/checkout-session`
    async fn create_checkout_session(&self, body: &Value) -> Result<CheckoutSession>;

    /// `POST /api/v4/groups/create-plan`
    async fn create_group_plan(&self, body: &Value) -> Result<CheckoutSession>;

    /// `POST /stripe/subscribe/edit`
    async fn edit_checkout_session(&self, group_id: Option<&str>) -> Result<CheckoutSession>;

    /// `GET /<provider>/subscribe/cancel`
    async fn cancel_subscription(&self, payment_method: &str, group_id: Option<&str>) -> Result<()>;

    /// Reload the signed-in user
    async fn fetch_account(&self) -> Result<Account>;
}
