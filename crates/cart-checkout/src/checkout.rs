//! Stripe Checkout Integration
//!
//! Creates Stripe hosted Checkout sessions from cart line items. Prices are
//! sent inline (`price_data`), so no Stripe product catalogue is needed.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, Currency,
};

use cart_core::BillingInterval;

use crate::error::{PaymentError, Result};
use crate::session::{CheckoutMode, CheckoutRequest, CheckoutSession, SessionClient, SessionLineItem};

/// Stripe client wrapper
pub struct StripeSessionClient {
    client: Client,
}

impl StripeSessionClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        Ok(Self::new(&secret_key))
    }
}

#[async_trait]
impl SessionClient for StripeSessionClient {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        request.validate()?;

        let success_url = request
            .success_url
            .as_deref()
            .ok_or_else(|| PaymentError::InvalidRequest("success URL is required".into()))?;
        let cancel_url = request
            .cancel_url
            .as_deref()
            .ok_or_else(|| PaymentError::InvalidRequest("cancel URL is required".into()))?;

        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(success_url);
        params.cancel_url = Some(cancel_url);
        params.mode = Some(match request.mode {
            CheckoutMode::Payment => CheckoutSessionMode::Payment,
            CheckoutMode::Subscription => CheckoutSessionMode::Subscription,
        });

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("cart_mode".to_string(), request.mode.as_str().to_string());
        metadata.insert("item_count".to_string(), request.items.len().to_string());
        params.metadata = Some(metadata);

        params.line_items = Some(
            request
                .items
                .iter()
                .map(|item| stripe_line_item(item, request.mode))
                .collect::<Result<Vec<_>>>()?,
        );

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::info!(session_id = %session.id, mode = %request.mode, "Created Stripe checkout session");

        Ok(CheckoutSession {
            url,
            session_id: session.id.to_string(),
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

/// Price in cents, rounded half-to-even
fn to_minor_units(price: Decimal) -> Result<i64> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or_else(|| PaymentError::InvalidRequest(format!("price {price} out of range")))
}

fn stripe_line_item(item: &SessionLineItem, mode: CheckoutMode) -> Result<CreateCheckoutSessionLineItems> {
    let recurring = match mode {
        CheckoutMode::Payment => None,
        CheckoutMode::Subscription => Some(CreateCheckoutSessionLineItemsPriceDataRecurring {
            interval: match item.interval.unwrap_or_default() {
                BillingInterval::Month => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month,
                BillingInterval::Year => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year,
            },
            interval_count: Some(1),
        }),
    };

    Ok(CreateCheckoutSessionLineItems {
        quantity: Some(u64::from(item.quantity)),
        price_data: Some(CreateCheckoutSessionLineItemsPriceData {
            currency: Currency::USD,
            unit_amount: Some(to_minor_units(item.price)?),
            product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                name: item.name.clone(),
                images: item.image.clone().map(|image| vec![image]),
                ..Default::default()
            }),
            recurring,
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, interval: Option<BillingInterval>) -> SessionLineItem {
        SessionLineItem {
            name: "Retainer".into(),
            price,
            quantity: 3,
            image: Some("https://cdn.test/r.png".into()),
            interval,
        }
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(dec!(29)).unwrap(), 2900);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(0.125)).unwrap(), 12);
        assert_eq!(to_minor_units(dec!(0.135)).unwrap(), 14);
        assert!(matches!(to_minor_units(Decimal::MAX), Err(PaymentError::InvalidRequest(_))));
    }

    #[test]
    fn test_subscription_line_item() {
        let item = stripe_line_item(&line(dec!(30), None), CheckoutMode::Subscription).unwrap();
        let price = item.price_data.unwrap();

        assert_eq!(item.quantity, Some(3));
        assert_eq!(price.unit_amount, Some(3000));
        let recurring = price.recurring.unwrap();
        assert_eq!(recurring.interval, CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year);
        assert_eq!(
            price.product_data.unwrap().images,
            Some(vec!["https://cdn.test/r.png".to_string()])
        );
    }

    #[test]
    fn test_payment_line_item_has_no_recurring() {
        let item = stripe_line_item(&line(dec!(5), Some(BillingInterval::Month)), CheckoutMode::Payment).unwrap();
        assert!(item.price_data.unwrap().recurring.is_none());
    }

    #[tokio::test]
    async fn test_rejects_before_calling_stripe() {
        let client = StripeSessionClient::new("sk_test_unused");
        let request = CheckoutRequest {
            items: vec![line(dec!(5), None)],
            mode: CheckoutMode::Payment,
            success_url: None,
            cancel_url: Some("https://site.test/cancel".into()),
        };

        let err = client.create_session(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }
}
