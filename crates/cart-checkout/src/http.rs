//! HTTP Session Client
//!
//! Posts a [`CheckoutRequest`] as JSON to a `create-checkout-session`
//! endpoint and reads back `{ url, sessionId }`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{PaymentError, Result};
use crate::session::{CheckoutRequest, CheckoutSession, SessionClient};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/create-checkout-session";

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Session client for a remote checkout endpoint
#[derive(Clone, Debug)]
pub struct HttpSessionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSessionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create from `CART_CHECKOUT_ENDPOINT`, falling back to [`DEFAULT_ENDPOINT`]
    pub fn from_env() -> Self {
        Self::new(std::env::var("CART_CHECKOUT_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

            tracing::debug!(status = status.as_u16(), message = %message, "Checkout endpoint rejected request");
            return Err(PaymentError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| PaymentError::Transport(format!("invalid session response: {e}")))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Server-provided error text: the `error` field of a JSON body, else the raw body
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(error) }) if !error.is_empty() => Some(error),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}
