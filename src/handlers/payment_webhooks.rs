use crate::{errors::ServiceError, services::webhooks::WebhookProcessor, AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::warn;

/// Creates the router for the payment-processor webhook
pub fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(payment_webhook))
}

/// POST /api/checkout/webhook
///
/// Signature verification happens before the payload is even parsed; an
/// unverifiable request mutates nothing. A processing error returns 5xx
/// so the processor redelivers, which is safe because every pipeline step
/// is idempotent.
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.payment_webhook_secret.as_deref() {
        let verified = WebhookProcessor::verify_signature(
            &headers,
            &body,
            secret,
            state.config.payment_webhook_tolerance_secs,
        );
        if !verified {
            warn!("payment webhook signature verification failed");
            return Err(ServiceError::BadRequest(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let event = WebhookProcessor::parse_event(&body)?;
    state.services.webhooks.process(event).await?;

    Ok((StatusCode::OK, "ok"))
}
