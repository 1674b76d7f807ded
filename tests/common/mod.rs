// Each integration-test crate compiles this module on its own, so not
// every helper is used everywhere.
#![allow(dead_code)]

use async_trait::async_trait;
use cacao_api::{
    config::AppConfig,
    db,
    entities::{
        discount, discount_exclusion, flavour, product, shipping_company, shipping_option,
        DiscountType,
    },
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    identity::{mint_session_token, RequestIdentity},
    services::payments::{CreatePaymentSessionRequest, PaymentClient, PaymentSessionHandle},
    services::Mailer,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Payment client stub: records every request and hands back a canned
/// redirect.
#[derive(Default)]
pub struct StubPaymentClient {
    pub requests: Mutex<Vec<CreatePaymentSessionRequest>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentClient for StubPaymentClient {
    async fn create_checkout_session(
        &self,
        request: CreatePaymentSessionRequest,
    ) -> Result<PaymentSessionHandle, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "stub processor offline".to_string(),
            ));
        }
        let id = format!("cs_test_{}", request.checkout_session_id.simple());
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request);
        Ok(PaymentSessionHandle {
            url: format!("https://pay.example/{}", id),
            id,
        })
    }
}

/// Mailer stub: counts deliveries, optionally failing them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: AtomicUsize,
    pub fail: AtomicBool,
    pub recipients: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_order_confirmation(
        &self,
        _order: &cacao_api::entities::order::Model,
        recipient: &str,
    ) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::InternalError("smtp unavailable".to_string()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.recipients
            .lock()
            .expect("recipient log poisoned")
            .push(recipient.to_string());
        Ok(())
    }
}

/// Application harness backed by an in-memory SQLite database.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub payments: Arc<StubPaymentClient>,
    pub mailer: Arc<RecordingMailer>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single pooled connection keeps every query on the same
        // in-memory database.
        let config = Arc::new(AppConfig::for_database("sqlite::memory:"));

        let pool = db::establish_connection(&config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let payments = Arc::new(StubPaymentClient::default());
        let mailer = Arc::new(RecordingMailer::default());

        let services = AppServices::new(
            db.clone(),
            Arc::new(event_sender),
            payments.clone(),
            mailer.clone(),
            config.clone(),
        );

        Self {
            db,
            config,
            services,
            payments,
            mailer,
            _event_task: event_task,
        }
    }

    /// Seed a product and return its id.
    pub async fn seed_product(
        &self,
        name: &str,
        base_price: Decimal,
        units_per_box: i32,
        stripe_price_id: &str,
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            slug: Set(name.to_lowercase().replace(' ', "-")),
            description: Set(format!("{} description", name)),
            base_price: Set(base_price),
            stripe_price_id: Set(stripe_price_id.to_string()),
            weight_grams: Set(250),
            units_per_box: Set(units_per_box),
            active: Set(true),
            sold_out: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed product");
        id
    }

    pub async fn seed_flavour(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        flavour::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            slug: Set(name.to_lowercase().replace(' ', "-")),
            description: Set(format!("{} description", name)),
            mini_description: Set(name.to_string()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed flavour");
        id
    }

    /// Seed an active discount; `excluded` products do not contribute to
    /// percentage reductions.
    pub async fn seed_discount(
        &self,
        code: &str,
        discount_type: DiscountType,
        amount: Decimal,
        min_order_value: Decimal,
        excluded: &[Uuid],
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        discount::ActiveModel {
            id: Set(id),
            title: Set(format!("{} promotion", code)),
            code: Set(code.to_string()),
            stripe_id: Set(format!("coupon_{}", code.to_lowercase())),
            discount_type: Set(discount_type),
            amount: Set(amount),
            min_order_value: Set(min_order_value),
            start_date: Set(None),
            end_date: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed discount");

        for product_id in excluded {
            discount_exclusion::ActiveModel {
                id: Set(Uuid::new_v4()),
                discount_id: Set(id),
                product_id: Set(*product_id),
            }
            .insert(&*self.db)
            .await
            .expect("failed to seed discount exclusion");
        }
        id
    }

    /// Seed a carrier + option; returns the option id.
    pub async fn seed_shipping_option(
        &self,
        name: &str,
        delivery_speed: &str,
        price_minor_units: i32,
    ) -> Uuid {
        let now = Utc::now();
        let company_id = Uuid::new_v4();
        shipping_company::ActiveModel {
            id: Set(company_id),
            name: Set("Royal Post".to_string()),
            code: Set(format!("royal-post-{}", company_id.simple())),
            active: Set(true),
            tracking_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed shipping company");

        let id = Uuid::new_v4();
        shipping_option::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            name: Set(name.to_string()),
            delivery_speed: Set(delivery_speed.to_string()),
            price: Set(Decimal::from(price_minor_units) / Decimal::from(100)),
            price_minor_units: Set(price_minor_units),
            estimated_days_min: Set(2),
            estimated_days_max: Set(3),
            service_code: Set(format!("SVC-{}", id.simple())),
            active: Set(true),
            description: Set(format!("{} delivery", name)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed shipping option");
        id
    }
}

/// A fresh anonymous identity, as the extractor would mint it.
pub fn guest_identity() -> RequestIdentity {
    RequestIdentity {
        user: None,
        session_token: mint_session_token(),
        minted: true,
    }
}

/// An authenticated identity, as the trusted headers would carry it.
pub fn user_identity(email: &str) -> RequestIdentity {
    RequestIdentity {
        user: Some(cacao_api::identity::AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        }),
        session_token: mint_session_token(),
        minted: false,
    }
}
