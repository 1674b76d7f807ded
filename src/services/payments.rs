use crate::errors::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// One cart line quoted to the processor, by its pre-registered price id.
#[derive(Debug, Clone)]
pub struct PaymentLineItem {
    pub price_id: String,
    pub quantity: i32,
}

/// Shipping quoted to the processor as a one-off rate.
#[derive(Debug, Clone)]
pub struct PaymentShippingOption {
    pub display_name: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub estimated_days_min: i16,
    pub estimated_days_max: i16,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentSessionRequest {
    pub line_items: Vec<PaymentLineItem>,
    pub customer_email: Option<String>,
    pub currency: String,
    /// Processor coupon id, when the cart carries a valid discount
    pub coupon_id: Option<String>,
    pub shipping_option: Option<PaymentShippingOption>,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried in metadata; the webhook resolves the session by it
    pub checkout_session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Redirect handle returned by the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSessionHandle {
    pub id: String,
    pub url: String,
}

/// The payment processor, as far as this service is concerned: hosted
/// checkout session creation. Constructed once at startup and passed in —
/// no ambient module-level API key.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CreatePaymentSessionRequest,
    ) -> Result<PaymentSessionHandle, ServiceError>;
}

/// Stripe-shaped HTTP implementation.
pub struct StripePaymentClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripePaymentClient {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    fn form_fields(request: &CreatePaymentSessionRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "client_reference_id".to_string(),
                request.checkout_session_id.to_string(),
            ),
            (
                "success_url".to_string(),
                request.success_url.clone(),
            ),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "currency".to_string(),
                request.currency.to_lowercase(),
            ),
            (
                "metadata[checkout_session_id]".to_string(),
                request.checkout_session_id.to_string(),
            ),
            (
                "expires_at".to_string(),
                request.expires_at.timestamp().to_string(),
            ),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            fields.push((format!("line_items[{}][price]", i), item.price_id.clone()));
            fields.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }

        if let Some(email) = &request.customer_email {
            fields.push(("customer_email".to_string(), email.clone()));
        }

        if let Some(coupon) = &request.coupon_id {
            fields.push(("discounts[0][coupon]".to_string(), coupon.clone()));
        }

        if let Some(shipping) = &request.shipping_option {
            let prefix = "shipping_options[0][shipping_rate_data]";
            fields.push((format!("{}[type]", prefix), "fixed_amount".to_string()));
            fields.push((
                format!("{}[display_name]", prefix),
                shipping.display_name.clone(),
            ));
            fields.push((
                format!("{}[fixed_amount][amount]", prefix),
                shipping.amount_minor_units.to_string(),
            ));
            fields.push((
                format!("{}[fixed_amount][currency]", prefix),
                shipping.currency.to_lowercase(),
            ));
            fields.push((
                format!("{}[delivery_estimate][minimum][unit]", prefix),
                "business_day".to_string(),
            ));
            fields.push((
                format!("{}[delivery_estimate][minimum][value]", prefix),
                shipping.estimated_days_min.to_string(),
            ));
            fields.push((
                format!("{}[delivery_estimate][maximum][unit]", prefix),
                "business_day".to_string(),
            ));
            fields.push((
                format!("{}[delivery_estimate][maximum][value]", prefix),
                shipping.estimated_days_max.to_string(),
            ));
        }

        fields
    }
}

#[async_trait]
impl PaymentClient for StripePaymentClient {
    #[instrument(skip(self, request), fields(checkout_session_id = %request.checkout_session_id))]
    async fn create_checkout_session(
        &self,
        request: CreatePaymentSessionRequest,
    ) -> Result<PaymentSessionHandle, ServiceError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let fields = Self::form_fields(&request);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                error!("payment session request failed: {}", e);
                ServiceError::ExternalServiceError(format!("payment processor unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "payment processor rejected session creation");
            return Err(ServiceError::ExternalServiceError(format!(
                "payment processor returned {}",
                status
            )));
        }

        let handle: PaymentSessionHandle = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("malformed processor response: {}", e))
        })?;

        info!(processor_session_id = %handle.id, "payment session created");
        Ok(handle)
    }
}
