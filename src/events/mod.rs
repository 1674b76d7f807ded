use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Events emitted by the services as side effects complete. Consumed by a
/// background task; delivery is best effort and never blocks a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartDeactivated(Uuid),

    // Discount events
    DiscountApplied { cart_id: Uuid, discount_id: Uuid },
    DiscountRemoved { cart_id: Uuid },

    // Checkout events
    CheckoutSessionCreated { session_id: Uuid, cart_id: Uuid },
    PaymentSessionCreated { session_id: Uuid },
    PaymentCompleted { session_id: Uuid },
    PaymentFailed { session_id: Uuid },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Notification events
    EmailQueued { record_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failures to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (not propagating) channel failures.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("event delivery failed: {}", e);
        }
    }
}

/// Background consumer: logs every event. The channel closing shuts the
/// task down cleanly.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "domain event");
    }
    info!("event channel closed, stopping event processor");
}
