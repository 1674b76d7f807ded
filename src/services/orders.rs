use crate::{
    entities::{
        cart, checkout_session, order, order_status_history, Cart, CheckoutSession, Order,
        OrderStatus, OrderStatusHistory,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    identity::CartOwner,
};
use chrono::{Datelike, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Alphabet for order-id suffixes; ambiguous characters (0, 1, I, O) are
/// left out so the reference survives being read over the phone.
const ORDER_ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const ORDER_ID_SUFFIX_LEN: usize = 4;

/// Order lifecycle: creation from a paid checkout session and the
/// append-only status history that follows.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    order_id_prefix: String,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        order_id_prefix: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            order_id_prefix,
        }
    }

    /// Generate a human-readable order reference, e.g. "CC26-B4K9".
    pub fn generate_order_id(prefix: &str) -> String {
        let year = Utc::now().year() % 100;
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..ORDER_ID_ALPHABET.len());
                ORDER_ID_ALPHABET[idx] as char
            })
            .collect();
        format!("{}{:02}-{}", prefix, year, suffix)
    }

    /// Create the order for a paid checkout session, exactly once.
    ///
    /// A retried webhook that already got as far as order creation finds
    /// the existing row and returns it untouched. The freshly created
    /// order starts in `processing` with a matching history entry.
    #[instrument(skip(self, conn))]
    pub async fn create_from_checkout<C: ConnectionTrait>(
        &self,
        conn: &C,
        checkout_session_id: Uuid,
    ) -> Result<(order::Model, bool), ServiceError> {
        if let Some(existing) = Order::find()
            .filter(order::Column::CheckoutSessionId.eq(checkout_session_id))
            .one(conn)
            .await?
        {
            info!(order_id = %existing.order_id, "order already exists for checkout session");
            return Ok((existing, false));
        }

        // Regenerate on the rare reference collision
        let mut reference = Self::generate_order_id(&self.order_id_prefix);
        while Order::find()
            .filter(order::Column::OrderId.eq(reference.clone()))
            .one(conn)
            .await?
            .is_some()
        {
            reference = Self::generate_order_id(&self.order_id_prefix);
        }

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(reference),
            checkout_session_id: Set(checkout_session_id),
            status: Set(OrderStatus::Processing),
            shipped_at: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order.insert(conn).await?;

        self.append_history(conn, order.id, "processing", Some("Order created"), None)
            .await?;

        info!(order_id = %order.order_id, checkout_session_id = %checkout_session_id, "order created");
        Ok((order, true))
    }

    pub async fn append_history<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
        status: &str,
        notes: Option<&str>,
        created_by: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(status.to_string()),
            notes: Set(notes.map(|n| n.to_string())),
            created_by: Set(created_by),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        notes: Option<&str>,
        actor: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        let now = Utc::now();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        match new_status {
            OrderStatus::Shipped => active.shipped_at = Set(Some(now)),
            OrderStatus::Delivered => active.delivered_at = Set(Some(now)),
            _ => {}
        }
        active.updated_at = Set(now);
        let updated = active.update(&*self.db).await?;

        self.append_history(&*self.db, updated.id, status_label(new_status), notes, actor)
            .await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: updated.id,
                old_status: status_label(old_status).to_string(),
                new_status: status_label(new_status).to_string(),
            })
            .await;
        Ok(updated)
    }

    pub async fn mark_shipped(
        &self,
        order_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        self.transition(order_id, OrderStatus::Shipped, Some("Order dispatched"), actor)
            .await
    }

    pub async fn mark_delivered(
        &self,
        order_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        self.transition(order_id, OrderStatus::Delivered, None, actor).await
    }

    /// Orders for the requesting owner, newest first.
    pub async fn list_for_owner(
        &self,
        owner: &CartOwner,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderView>, u64), ServiceError> {
        let carts_query = match owner {
            CartOwner::User(id) => Cart::find().filter(cart::Column::UserId.eq(*id)),
            CartOwner::Session(token) => Cart::find()
                .filter(cart::Column::SessionId.eq(token.clone()))
                .filter(cart::Column::UserId.is_null()),
        };

        let carts: Vec<Uuid> = carts_query
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let sessions: Vec<Uuid> = CheckoutSession::find()
            .filter(checkout_session::Column::CartId.is_in(carts))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let paginator = Order::find()
            .filter(order::Column::CheckoutSessionId.is_in(sessions))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.view(order).await?);
        }
        Ok((views, total))
    }

    /// Fetch one order by its human-readable reference, owner-scoped.
    pub async fn get_by_reference(
        &self,
        owner: &CartOwner,
        reference: &str,
    ) -> Result<OrderView, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderId.eq(reference))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", reference)))?;

        let session = order
            .find_related(CheckoutSession)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Order {} references missing checkout session",
                    order.order_id
                ))
            })?;
        let cart = session
            .find_related(Cart)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Checkout session {} references missing cart",
                    session.id
                ))
            })?;

        let owns = match owner {
            CartOwner::User(id) => cart.user_id == Some(*id),
            CartOwner::Session(token) => {
                cart.user_id.is_none() && cart.session_id.as_deref() == Some(token.as_str())
            }
        };
        if !owns {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                reference
            )));
        }

        self.view(order).await
    }

    /// Assemble the order view, reading email and payment reference
    /// through the owning checkout session.
    async fn view(&self, order: order::Model) -> Result<OrderView, ServiceError> {
        let session = order.find_related(CheckoutSession).one(&*self.db).await?;
        let history = OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order.id))
            .order_by_desc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(OrderView {
            id: order.id,
            order_id: order.order_id,
            status: order.status,
            email: session.as_ref().and_then(|s| s.email.clone()),
            payment_status: session.as_ref().map(|s| s.payment_status),
            payment_intent: session.as_ref().and_then(|s| s.stripe_payment_intent.clone()),
            shipping_address_id: session.as_ref().and_then(|s| s.shipping_address_id),
            billing_address_id: session.as_ref().and_then(|s| s.billing_address_id),
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
            status_history: history
                .into_iter()
                .map(|h| OrderStatusHistoryView {
                    status: h.status,
                    notes: h.notes,
                    created_by: h.created_by,
                    created_at: h.created_at,
                })
                .collect(),
        })
    }
}

/// The stored string form of an order status.
fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Processing => "processing",
        OrderStatus::Shipped => "shipped",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::Refunded => "refunded",
    }
}

#[derive(Debug, Serialize)]
pub struct OrderStatusHistoryView {
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub order_id: String,
    pub status: OrderStatus,
    pub email: Option<String>,
    pub payment_status: Option<crate::entities::PaymentStatus>,
    pub payment_intent: Option<String>,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub shipped_at: Option<chrono::DateTime<Utc>>,
    pub delivered_at: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
    pub status_history: Vec<OrderStatusHistoryView>,
}
