use crate::{
    entities::{cart, checkout_session, Cart, CheckoutSession, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{mailer::NotificationService, orders::OrderService},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// A parsed payment-processor event, reduced to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        checkout_session_id: Uuid,
        processor_session_id: Option<String>,
        payment_intent: Option<String>,
    },
    PaymentFailed {
        checkout_session_id: Uuid,
    },
    Ignored {
        event_type: String,
    },
}

/// Consumes signed payment-processor events and drives the checkout
/// session to its terminal state.
///
/// Delivery is at-least-once and may hit any process instance, so every
/// step re-checks its own idempotency condition instead of assuming a
/// fresh start: the status flip guards on `Pending`, order creation on
/// row existence, cart deactivation on the active flag, and the email on
/// its record.
#[derive(Clone)]
pub struct WebhookProcessor {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    orders: Arc<OrderService>,
    notifications: Arc<NotificationService>,
}

impl WebhookProcessor {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        orders: Arc<OrderService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            orders,
            notifications,
        }
    }

    /// Verify the `Stripe-Signature` header (`t=<ts>,v1=<hmac>` scheme)
    /// over the raw payload. Signatures older than `tolerance_secs` are
    /// rejected even when the digest matches.
    pub fn verify_signature(
        headers: &HeaderMap,
        payload: &[u8],
        secret: &str,
        tolerance_secs: u64,
    ) -> bool {
        let Some(signature) = headers
            .get("Stripe-Signature")
            .and_then(|h| h.to_str().ok())
        else {
            return false;
        };

        let mut timestamp = "";
        let mut v1 = "";
        for part in signature.split(',') {
            let mut it = part.trim().splitn(2, '=');
            match (it.next(), it.next()) {
                (Some("t"), Some(value)) => timestamp = value,
                (Some("v1"), Some(value)) => v1 = value,
                _ => {}
            }
        }
        if timestamp.is_empty() || v1.is_empty() {
            return false;
        }

        if let Ok(ts) = timestamp.parse::<i64>() {
            let now = Utc::now().timestamp();
            if (now - ts).unsigned_abs() > tolerance_secs {
                return false;
            }
        } else {
            return false;
        }

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_eq(&expected, v1)
    }

    /// Compute the signature header value for a payload. Test-facing
    /// counterpart of [`verify_signature`].
    pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    /// Parse a raw event payload. Unknown event types are reported as
    /// `Ignored` rather than rejected, so the processor does not retry
    /// them forever.
    pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, ServiceError> {
        let json: Value = serde_json::from_slice(payload)
            .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {}", e)))?;

        let event_type = json
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::BadRequest("webhook event missing type".to_string()))?;

        let object = json
            .get("data")
            .and_then(|d| d.get("object"))
            .cloned()
            .unwrap_or(Value::Null);

        let session_id_from_metadata = |object: &Value| -> Result<Uuid, ServiceError> {
            object
                .get("metadata")
                .and_then(|m| m.get("checkout_session_id"))
                .and_then(|v| v.as_str())
                .and_then(|v| Uuid::parse_str(v).ok())
                .ok_or_else(|| {
                    ServiceError::BadRequest(
                        "webhook event missing checkout_session_id metadata".to_string(),
                    )
                })
        };

        match event_type {
            "checkout.session.completed" => Ok(WebhookEvent::CheckoutCompleted {
                checkout_session_id: session_id_from_metadata(&object)?,
                processor_session_id: object
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                payment_intent: object
                    .get("payment_intent")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            }),
            "payment_intent.payment_failed" => Ok(WebhookEvent::PaymentFailed {
                checkout_session_id: session_id_from_metadata(&object)?,
            }),
            other => Ok(WebhookEvent::Ignored {
                event_type: other.to_string(),
            }),
        }
    }

    /// Process a verified event.
    #[instrument(skip(self, event))]
    pub async fn process(&self, event: WebhookEvent) -> Result<(), ServiceError> {
        match event {
            WebhookEvent::CheckoutCompleted {
                checkout_session_id,
                processor_session_id,
                payment_intent,
            } => {
                self.handle_completed(checkout_session_id, processor_session_id, payment_intent)
                    .await
            }
            WebhookEvent::PaymentFailed {
                checkout_session_id,
            } => self.handle_failed(checkout_session_id).await,
            WebhookEvent::Ignored { event_type } => {
                info!(%event_type, "ignoring unhandled webhook event type");
                Ok(())
            }
        }
    }

    /// Payment completed: flip the session, materialize the order,
    /// retire the cart, send the confirmation. Steps after the flip are
    /// individually idempotent, so a crash mid-way is recovered by the
    /// processor redelivering the event.
    async fn handle_completed(
        &self,
        checkout_session_id: Uuid,
        processor_session_id: Option<String>,
        payment_intent: Option<String>,
    ) -> Result<(), ServiceError> {
        let session = CheckoutSession::find_by_id(checkout_session_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(%checkout_session_id, "webhook for unknown checkout session");
                ServiceError::NotFound(format!(
                    "Checkout session {} not found",
                    checkout_session_id
                ))
            })?;

        // Idempotency guard: a redelivered completed event is a no-op
        if session.payment_status == PaymentStatus::Paid {
            info!(%checkout_session_id, "session already paid, nothing to do");
            return Ok(());
        }
        if session.payment_status != PaymentStatus::Pending {
            warn!(
                %checkout_session_id,
                status = ?session.payment_status,
                "completed event for session in terminal state, ignoring"
            );
            return Ok(());
        }

        let cart_id = session.cart_id;
        let mut active: checkout_session::ActiveModel = session.into();
        active.payment_status = Set(PaymentStatus::Paid);
        active.stripe_payment_intent = Set(payment_intent);
        if let Some(processor_id) = processor_session_id {
            active.stripe_session_id = Set(Some(processor_id));
        }
        active.updated_at = Set(Utc::now());
        let session = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::PaymentCompleted {
                session_id: session.id,
            })
            .await;

        let (order, order_created) = self
            .orders
            .create_from_checkout(&*self.db, session.id)
            .await?;
        if order_created {
            self.event_sender
                .send_or_log(Event::OrderCreated(order.id))
                .await;
        }

        let cart = Cart::find_by_id(cart_id).one(&*self.db).await?;
        if let Some(found) = cart {
            if found.active {
                let mut active: cart::ActiveModel = found.into();
                active.active = Set(false);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::CartDeactivated(cart_id))
                    .await;
            }
        }

        // Guest sessions carry their email; user sessions snapshotted the
        // account email at creation.
        let recipient = session.email.clone();
        self.notifications
            .send_order_confirmation_once(&*self.db, &order, recipient.as_deref())
            .await?;

        info!(
            %checkout_session_id,
            order_id = %order.order_id,
            "payment completed event processed"
        );
        Ok(())
    }

    /// Payment failed: `Pending → Failed`, no order. Terminal sessions
    /// log and return success so redelivery stays quiet.
    async fn handle_failed(&self, checkout_session_id: Uuid) -> Result<(), ServiceError> {
        let session = CheckoutSession::find_by_id(checkout_session_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Checkout session {} not found",
                    checkout_session_id
                ))
            })?;

        if session.payment_status.is_terminal() {
            info!(
                %checkout_session_id,
                status = ?session.payment_status,
                "failed event for terminal session, ignoring"
            );
            return Ok(());
        }

        let mut active: checkout_session::ActiveModel = session.into();
        active.payment_status = Set(PaymentStatus::Failed);
        active.updated_at = Set(Utc::now());
        let session = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentFailed {
                session_id: session.id,
            })
            .await;
        info!(%checkout_session_id, "payment failed event processed");
        Ok(())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const SECRET: &str = "whsec_test";

    fn signed_headers(payload: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let signature = WebhookProcessor::sign_payload(payload, SECRET, Utc::now().timestamp());
        headers.insert("Stripe-Signature", HeaderValue::from_str(&signature).unwrap());
        headers
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let headers = signed_headers(payload);
        assert!(WebhookProcessor::verify_signature(
            &headers, payload, SECRET, 300
        ));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let headers = signed_headers(payload);
        assert!(!WebhookProcessor::verify_signature(
            &headers,
            br#"{"type":"something.else"}"#,
            SECRET,
            300
        ));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let payload = b"{}";
        let headers = signed_headers(payload);
        assert!(!WebhookProcessor::verify_signature(
            &headers, payload, "whsec_other", 300
        ));
    }

    #[test]
    fn stale_timestamp_fails_verification() {
        let payload = b"{}";
        let old = Utc::now().timestamp() - 3600;
        let signature = WebhookProcessor::sign_payload(payload, SECRET, old);
        let mut headers = HeaderMap::new();
        headers.insert("Stripe-Signature", HeaderValue::from_str(&signature).unwrap());
        assert!(!WebhookProcessor::verify_signature(
            &headers, payload, SECRET, 300
        ));
    }

    #[test]
    fn missing_header_fails_verification() {
        assert!(!WebhookProcessor::verify_signature(
            &HeaderMap::new(),
            b"{}",
            SECRET,
            300
        ));
    }

    #[test]
    fn parses_completed_event() {
        let session_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "payment_intent": "pi_456",
                    "metadata": { "checkout_session_id": session_id.to_string() }
                }
            }
        });
        let event = WebhookProcessor::parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::CheckoutCompleted {
                checkout_session_id: session_id,
                processor_session_id: Some("cs_test_123".to_string()),
                payment_intent: Some("pi_456".to_string()),
            }
        );
    }

    #[test]
    fn parses_failed_event() {
        let session_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "type": "payment_intent.payment_failed",
            "data": {
                "object": {
                    "metadata": { "checkout_session_id": session_id.to_string() }
                }
            }
        });
        let event = WebhookProcessor::parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::PaymentFailed {
                checkout_session_id: session_id
            }
        );
    }

    #[test]
    fn unknown_event_type_is_ignored_not_rejected() {
        let payload = br#"{"type":"invoice.created","data":{"object":{}}}"#;
        let event = WebhookProcessor::parse_event(payload).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Ignored {
                event_type: "invoice.created".to_string()
            }
        );
    }

    #[test]
    fn completed_event_without_metadata_is_rejected() {
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        assert!(WebhookProcessor::parse_event(payload).is_err());
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(WebhookProcessor::parse_event(b"not json").is_err());
    }
}
