//! HTTP Backend
//!
//! Implementation of `BackendApi` over the questpay REST API.

use std::time::Duration;

use async_trait::async_trait;
use questpay_core::{
    Account, ApiErrorBody, BackendApi, CheckoutSession, Envelope, GROUP_CREATE_PLAN_PATH,
    PaymentError, Result, STRIPE_CHECKOUT_SESSION_PATH, STRIPE_EDIT_PATH, cancel_path,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Path returning the signed-in user
pub const USER_PATH: &str = "/api/v4/user";

/// Backend connection settings
#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// API origin, e.g. `http://localhost:3000`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// `x-api-user` header
    pub api_user: Option<String>,

    /// `x-api-key` header
    pub api_key: Option<String>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            timeout_secs: 30,
            api_user: None,
            api_key: None,
        }
    }
}

impl HttpBackendConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("QUESTPAY_API_URL").unwrap_or(defaults.base_url);
        let timeout_secs = std::env::var("QUESTPAY_API_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url,
            timeout_secs,
            api_user: std::env::var("QUESTPAY_API_USER").ok(),
            api_key: std::env::var("QUESTPAY_API_KEY").ok(),
        }
    }
}

/// `reqwest`-backed backend client
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Create a client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(HttpBackendConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn from_config(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(HttpBackendConfig::from_env())
    }

    pub const fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(user) = &self.config.api_user {
            builder = builder.header("x-api-user", user);
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
    }

    /// Send and fail on non-success statuses with the server's message
    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        tracing::warn!(status = status.as_u16(), message = %message, "Backend request failed");
        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Send and unwrap the `{ data }` envelope
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Http(e.to_string()))?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn create_checkout_session(&self, body: &Value) -> Result<CheckoutSession> {
        tracing::debug!("Creating Stripe checkout session");
        self.fetch(self.request(Method::POST, STRIPE_CHECKOUT_SESSION_PATH).json(body))
            .await
    }

    async fn create_group_plan(&self, body: &Value) -> Result<CheckoutSession> {
        tracing::debug!("Creating group plan");
        self.fetch(self.request(Method::POST, GROUP_CREATE_PLAN_PATH).json(body))
            .await
    }

    async fn edit_checkout_session(&self, group_id: Option<&str>) -> Result<CheckoutSession> {
        let mut body = Map::new();
        if let Some(id) = group_id {
            body.insert("groupId".into(), json!(id));
        }
        self.fetch(
            self.request(Method::POST, STRIPE_EDIT_PATH)
                .json(&Value::Object(body)),
        )
        .await
    }

    async fn cancel_subscription(&self, payment_method: &str, group_id: Option<&str>) -> Result<()> {
        let path = cancel_path(payment_method, group_id);
        tracing::debug!(path = %path, "Cancelling subscription");
        self.execute(self.request(Method::GET, &path)).await?;
        Ok(())
    }

    async fn fetch_account(&self) -> Result<Account> {
        self.fetch(self.request(Method::GET, USER_PATH)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::from_config(HttpBackendConfig {
            base_url: server.uri(),
            api_user: Some("user-1".into()),
            api_key: Some("key-1".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpBackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_checkout_session_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stripe/checkout-session"))
            .and(header("x-api-user", "user-1"))
            .and(header("x-api-key", "key-1"))
            .and(body_json(json!({ "sub": "basic_3mo" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": { "sessionId": "cs_1" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = backend(&server)
            .create_checkout_session(&json!({ "sub": "basic_3mo" }))
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_1");
        assert!(session.group.is_none());
    }

    #[tokio::test]
    async fn test_group_plan_returns_group() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/groups/create-plan"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {
                    "sessionId": "cs_2",
                    "group": { "_id": "group-new", "name": "Fresh Party", "type": "guild", "memberCount": 1 },
                }
            })))
            .mount(&server)
            .await;

        let session = backend(&server)
            .create_group_plan(&json!({ "groupToCreate": { "name": "Fresh Party" } }))
            .await
            .unwrap();

        assert_eq!(session.group.unwrap().id.as_deref(), Some("group-new"));
    }

    #[tokio::test]
    async fn test_edit_omits_missing_group() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stripe/subscribe/edit"))
            .and(body_json(json!({})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "sessionId": "cs_3" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = backend(&server)
            .edit_checkout_session(None)
            .await
            .unwrap();
        assert_eq!(session.session_id, "cs_3");
    }

    #[tokio::test]
    async fn test_cancel_builds_provider_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paypal/subscribe/cancel"))
            .and(query_param("noRedirect", "true"))
            .and(query_param("groupId", "group-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .cancel_subscription("Paypal", Some("group-1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_failure_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stripe/subscribe/cancel"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": "NotAuthorized",
                "message": "No subscription to cancel",
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .cancel_subscription("stripe", None)
            .await
            .unwrap_err();

        match err {
            PaymentError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "No subscription to cancel");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "_id": "user-1",
                    "purchased": { "plan": { "paymentMethod": "Stripe", "dateTerminated": "2026-11-16T00:00:00.000Z" } },
                    "preferences": { "dateFormat": "yyyy/MM/dd" },
                    "stats": { "gp": 12 },
                }
            })))
            .mount(&server)
            .await;

        let account = backend(&server).fetch_account().await.unwrap();
        assert_eq!(account.date_terminated().as_deref(), Some("2026/11/16"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
        let err = backend.fetch_account().await.unwrap_err();
        assert!(matches!(err, PaymentError::Http(_)));
    }
}
