pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod health;
pub mod leads;
pub mod orders;
pub mod payment_webhooks;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    owner_locks::OwnerLocks,
    services::{
        AddressService, CartService, CatalogService, CheckoutService, DiscountService,
        LeadService, Mailer, NotificationService, OrderService, PaymentClient, WebhookProcessor,
    },
};
use axum::Router;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub discounts: Arc<DiscountService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub addresses: Arc<AddressService>,
    pub leads: Arc<LeadService>,
    pub webhooks: Arc<WebhookProcessor>,
}

impl AppServices {
    /// Wire every service against the shared pool, event channel and the
    /// explicitly constructed payment client and mailer.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        payment_client: Arc<dyn PaymentClient>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        let locks = OwnerLocks::new();

        let catalog = Arc::new(CatalogService::new(db_pool.clone()));
        let discounts = Arc::new(DiscountService::new(db_pool.clone()));
        let carts = Arc::new(CartService::new(
            db_pool.clone(),
            event_sender.clone(),
            discounts.clone(),
            locks,
        ));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            carts.clone(),
            payment_client,
            config.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
            config.order_id_prefix.clone(),
        ));
        let addresses = Arc::new(AddressService::new(db_pool.clone()));
        let leads = Arc::new(LeadService::new(db_pool.clone()));
        let notifications = Arc::new(NotificationService::new(mailer));
        let webhooks = Arc::new(WebhookProcessor::new(
            db_pool,
            event_sender,
            orders.clone(),
            notifications,
        ));

        Self {
            catalog,
            carts,
            discounts,
            checkout,
            orders,
            addresses,
            leads,
            webhooks,
        }
    }
}

/// Compose the full API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health::health_routes())
        .nest("/products", catalog::products_routes())
        .nest("/flavours", catalog::flavours_routes())
        .nest("/allergens", catalog::allergens_routes())
        .nest("/shipping", catalog::shipping_routes())
        .nest("/carts", carts::carts_routes())
        .nest(
            "/checkout",
            checkout::checkout_routes().merge(payment_webhooks::webhook_routes()),
        )
        .nest("/addresses", addresses::addresses_routes())
        .nest("/orders", orders::orders_routes())
        .nest("/leads", leads::leads_routes())
}
