//! Checkout Session Collaborator
//!
//! Wire types shared by every session backend and the trait the orchestrator
//! calls through.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use cart_core::{BillingInterval, LineItem, normalize_image};

use crate::error::{PaymentError, Result};
use crate::orchestrator::CheckoutConfig;

/// How the remote side bills a whole session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// One-time charge
    Payment,
    /// Recurring charge
    Subscription,
}

impl CheckoutMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item as sent to a session backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLineItem {
    pub name: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub quantity: u32,

    /// Never blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Set for subscription sessions only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<BillingInterval>,
}

impl SessionLineItem {
    pub fn from_line_item(item: &LineItem, mode: CheckoutMode) -> Self {
        let interval = match mode {
            CheckoutMode::Payment => None,
            CheckoutMode::Subscription => Some(item.billing.interval.unwrap_or_default()),
        };

        Self {
            name: item.name.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            image: normalize_image(item.image.clone()),
            interval,
        }
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<SessionLineItem>,

    pub mode: CheckoutMode,

    /// URL to redirect after successful payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,

    /// URL to redirect if checkout is cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

impl CheckoutRequest {
    /// Build a request for `items`, all billed under `mode`
    pub fn build(items: &[LineItem], mode: CheckoutMode, config: &CheckoutConfig) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| SessionLineItem::from_line_item(item, mode))
                .collect(),
            mode,
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }

    /// Reject requests no backend could turn into a session
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(PaymentError::InvalidRequest("no items to check out".into()));
        }

        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(PaymentError::InvalidRequest("item name is required".into()));
            }
            if item.quantity == 0 {
                return Err(PaymentError::InvalidRequest(format!(
                    "{}: quantity must be at least 1",
                    item.name
                )));
            }
            if item.price.is_sign_negative() && !item.price.is_zero() {
                return Err(PaymentError::InvalidRequest(format!(
                    "{}: price must not be negative",
                    item.name
                )));
            }
        }

        Ok(())
    }

    /// Fill missing redirect URLs
    pub fn with_default_urls(mut self, success_url: &str, cancel_url: &str) -> Self {
        self.success_url.get_or_insert_with(|| success_url.to_string());
        self.cancel_url.get_or_insert_with(|| cancel_url.to_string());
        self
    }
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// URL to redirect the user to
    pub url: String,

    /// Backend session ID
    pub session_id: String,
}

/// Checkout session backend (Strategy pattern)
///
/// Implementations must fail on any non-success answer from the remote side.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Create a session for `request`
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::LineItemInput;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscription_items_default_to_yearly() {
        let mut item = LineItem::from_input(
            LineItemInput::new("r", "Retainer", dec!(30)).recurring(BillingInterval::Month),
        );
        item.billing.interval = None;

        let line = SessionLineItem::from_line_item(&item, CheckoutMode::Subscription);
        assert_eq!(line.interval, Some(BillingInterval::Year));

        let line = SessionLineItem::from_line_item(&item, CheckoutMode::Payment);
        assert_eq!(line.interval, None);
    }

    #[test]
    fn test_blank_image_is_not_serialized() {
        let item = LineItem::from_input(LineItemInput::new("a", "Audit", dec!(10)).with_image(""));
        let request = CheckoutRequest::build(&[item], CheckoutMode::Payment, &CheckoutConfig::default());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["items"][0].get("image").is_none());
        assert_eq!(json["items"][0]["price"], serde_json::json!(10.0));
        assert_eq!(json["mode"], serde_json::json!("payment"));
        assert!(json.get("successUrl").is_none());
    }

    #[test]
    fn test_validate() {
        let empty = CheckoutRequest {
            items: Vec::new(),
            mode: CheckoutMode::Payment,
            success_url: None,
            cancel_url: None,
        };
        assert!(matches!(empty.validate(), Err(PaymentError::InvalidRequest(_))));

        let item = LineItem::from_input(LineItemInput::new("a", "Audit", dec!(10)));
        let mut request = CheckoutRequest::build(&[item], CheckoutMode::Payment, &CheckoutConfig::default());
        assert!(request.validate().is_ok());

        request.items[0].quantity = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_default_urls_do_not_override() {
        let config = CheckoutConfig::default().success_url("https://site.test/thanks");
        let item = LineItem::from_input(LineItemInput::new("a", "Audit", dec!(10)));
        let request = CheckoutRequest::build(&[item], CheckoutMode::Payment, &config)
            .with_default_urls("https://site.test/ok", "https://site.test/cancel");

        assert_eq!(request.success_url.as_deref(), Some("https://site.test/thanks"));
        assert_eq!(request.cancel_url.as_deref(), Some("https://site.test/cancel"));
    }
}
