use crate::{
    config::AppConfig,
    entities::{
        address, cart, checkout_session, Address, CheckoutSession, PaymentStatus, Product,
        ShippingOption,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    identity::{CartOwner, RequestIdentity},
    services::{
        carts::{CartService, PricedCart},
        payments::{
            CreatePaymentSessionRequest, PaymentClient, PaymentLineItem, PaymentSessionHandle,
            PaymentShippingOption,
        },
        pricing::{self, ShippingTerms},
    },
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Checkout orchestration: binds one cart to one payment attempt and
/// drives the session up to the external payment redirect. Status
/// transitions out of `Pending` belong to the webhook processor, never to
/// this service.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    carts: Arc<CartService>,
    payment_client: Arc<dyn PaymentClient>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        carts: Arc<CartService>,
        payment_client: Arc<dyn PaymentClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            carts,
            payment_client,
            config,
        }
    }

    /// Resolve the owner's current checkout session, creating one when no
    /// pending session exists for their active cart.
    ///
    /// Cart resolution and session creation share one transaction under
    /// the owner-key lock, so a first-touch checkout cannot race itself
    /// into duplicate carts or sessions. A guest session requires an email
    /// before it can be saved; a request that supplies an email for an
    /// existing guest session updates it in place.
    #[instrument(skip(self, identity, input))]
    pub async fn get_or_create_from_request(
        &self,
        identity: &RequestIdentity,
        input: CheckoutRequest,
    ) -> Result<checkout_session::Model, ServiceError> {
        let owner = identity.owner();
        let _guard = self.carts.locks().acquire(&owner.lock_key()).await;
        let txn = self.db.begin().await?;

        let (cart, cart_created) = self
            .carts
            .get_or_create_active_cart_in(&txn, &owner)
            .await?;

        let existing = CheckoutSession::find()
            .filter(checkout_session::Column::CartId.eq(cart.id))
            .filter(checkout_session::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .order_by_desc(checkout_session::Column::CreatedAt)
            .one(&txn)
            .await?;

        let session = match existing {
            Some(found) => {
                let session = if cart.user_id.is_none() {
                    match &input.email {
                        Some(email) => {
                            let mut active: checkout_session::ActiveModel = found.into();
                            active.email = Set(Some(email.clone()));
                            active.updated_at = Set(Utc::now());
                            active.update(&txn).await?
                        }
                        None => found,
                    }
                } else {
                    found
                };
                info!(checkout_session_id = %session.id, cart_id = %cart.id, "reusing pending checkout session");
                session
            }
            None => {
                // Guests must hand over an email before the session exists;
                // user carts snapshot the account email.
                let email = match identity.user_email() {
                    Some(email) => Some(email.to_string()),
                    None => input.email.clone(),
                };
                if cart.user_id.is_none() && email.is_none() {
                    return Err(ServiceError::ValidationError(
                        "Email is required for guest checkout".to_string(),
                    ));
                }

                let now = Utc::now();
                let session = checkout_session::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    shipping_address_id: Set(None),
                    billing_address_id: Set(None),
                    email: Set(email),
                    phone: Set(None),
                    payment_status: Set(PaymentStatus::Pending),
                    stripe_session_id: Set(None),
                    stripe_payment_intent: Set(None),
                    shipping_option_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                let session = session.insert(&txn).await?;
                info!(checkout_session_id = %session.id, cart_id = %cart.id, is_guest = cart.user_id.is_none(), "created checkout session");
                session
            }
        };

        txn.commit().await?;

        if cart_created {
            self.event_sender
                .send_or_log(Event::CartCreated(cart.id))
                .await;
        }
        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                session_id: session.id,
                cart_id: cart.id,
            })
            .await;
        Ok(session)
    }

    /// Load a session and verify the caller's cart owns it.
    async fn owned_session<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
        session_id: Uuid,
    ) -> Result<(checkout_session::Model, cart::Model), ServiceError> {
        let session = CheckoutSession::find_by_id(session_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Checkout session {} not found", session_id))
            })?;

        let cart = session
            .find_related(crate::entities::Cart)
            .one(conn)
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
                "Checkout session {} not found",
                session_id
            )));
        }

        Ok((session, cart))
    }

    /// Choose a shipping option for a pending session.
    #[instrument(skip(self))]
    pub async fn set_shipping_option(
        &self,
        owner: &CartOwner,
        session_id: Uuid,
        option_id: Uuid,
    ) -> Result<CheckoutSummary, ServiceError> {
        let txn = self.db.begin().await?;
        let (session, cart) = self.owned_session(&txn, owner, session_id).await?;

        if session.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "Checkout session is no longer pending".to_string(),
            ));
        }

        let option = ShippingOption::find_by_id(option_id)
            .one(&txn)
            .await?
            .filter(|o| o.active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipping option {} not found", option_id))
            })?;

        let mut active: checkout_session::ActiveModel = session.into();
        active.shipping_option_id = Set(Some(option.id));
        active.updated_at = Set(Utc::now());
        let session = active.update(&txn).await?;

        let summary = self.summarize(&txn, &session, &cart).await?;
        txn.commit().await?;
        Ok(summary)
    }

    /// Attach addresses and contact details to a pending session.
    #[instrument(skip(self, input))]
    pub async fn set_details(
        &self,
        owner: &CartOwner,
        session_id: Uuid,
        input: CheckoutDetailsInput,
    ) -> Result<CheckoutSummary, ServiceError> {
        let txn = self.db.begin().await?;
        let (session, cart) = self.owned_session(&txn, owner, session_id).await?;

        if session.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "Checkout session is no longer pending".to_string(),
            ));
        }

        let mut active: checkout_session::ActiveModel = session.into();

        if let Some(address_id) = input.shipping_address_id {
            self.owned_address(&txn, owner, address_id).await?;
            active.shipping_address_id = Set(Some(address_id));
        }
        if let Some(address_id) = input.billing_address_id {
            self.owned_address(&txn, owner, address_id).await?;
            active.billing_address_id = Set(Some(address_id));
        }
        if cart.user_id.is_none() {
            if let Some(email) = input.email {
                active.email = Set(Some(email));
            }
            if let Some(phone) = input.phone {
                active.phone = Set(Some(phone));
            }
        }

        active.updated_at = Set(Utc::now());
        let session = active.update(&txn).await?;

        let summary = self.summarize(&txn, &session, &cart).await?;
        txn.commit().await?;
        Ok(summary)
    }

    async fn owned_address<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
        address_id: Uuid,
    ) -> Result<address::Model, ServiceError> {
        let found = Address::find_by_id(address_id).one(conn).await?;
        let owns = found.as_ref().map(|a| match owner {
            CartOwner::User(id) => a.user_id == Some(*id),
            CartOwner::Session(token) => {
                a.user_id.is_none() && a.session_id.as_deref() == Some(token.as_str())
            }
        });
        match (found, owns) {
            (Some(address), Some(true)) => Ok(address),
            _ => Err(ServiceError::NotFound(format!(
                "Address {} not found",
                address_id
            ))),
        }
    }

    /// Current session state with the re-priced cart and shipping totals.
    pub async fn summary(
        &self,
        owner: &CartOwner,
        session_id: Uuid,
    ) -> Result<CheckoutSummary, ServiceError> {
        let (session, cart) = self.owned_session(&*self.db, owner, session_id).await?;
        self.summarize(&*self.db, &session, &cart).await
    }

    async fn summarize<C: ConnectionTrait>(
        &self,
        conn: &C,
        session: &checkout_session::Model,
        cart: &cart::Model,
    ) -> Result<CheckoutSummary, ServiceError> {
        let priced = self.carts.priced_cart(conn, cart).await?;

        let option = match session.shipping_option_id {
            Some(id) => ShippingOption::find_by_id(id).one(conn).await?,
            None => None,
        };

        let terms = option.as_ref().map(|o| ShippingTerms {
            delivery_speed: o.delivery_speed.clone(),
            price_minor_units: o.price_minor_units,
        });
        let shipping_cost = pricing::shipping_cost(
            terms.as_ref(),
            priced.discounted_total,
            self.config.free_shipping_threshold,
        );
        let total_with_shipping =
            pricing::total_with_shipping(priced.discounted_total, shipping_cost);

        Ok(CheckoutSummary {
            id: session.id,
            payment_status: session.payment_status,
            email: session.email.clone(),
            phone: session.phone.clone(),
            shipping_address_id: session.shipping_address_id,
            billing_address_id: session.billing_address_id,
            shipping_option: option.map(|o| ShippingOptionSummary {
                id: o.id,
                name: o.name,
                delivery_speed: o.delivery_speed,
                price: o.price,
                estimated_days_min: o.estimated_days_min,
                estimated_days_max: o.estimated_days_max,
            }),
            shipping_cost,
            total_with_shipping,
            cart: priced,
        })
    }

    /// Validate a session is ready for payment.
    fn validate_for_payment(
        session: &checkout_session::Model,
        cart: &cart::Model,
        priced: &PricedCart,
    ) -> Result<(), ServiceError> {
        if session.shipping_address_id.is_none() {
            return Err(ServiceError::ValidationError(
                "Shipping address is required".to_string(),
            ));
        }
        if session.email.is_none() && cart.user_id.is_none() {
            return Err(ServiceError::ValidationError(
                "Email is required for guest checkout".to_string(),
            ));
        }
        if priced.items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }
        if session.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "Checkout session is not pending payment".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the external payment session and return its redirect URL.
    ///
    /// The processor call is the one synchronous external dependency in
    /// checkout; failures surface as `ExternalServiceError` and the client
    /// may simply resubmit.
    #[instrument(skip(self, identity))]
    pub async fn create_payment_session(
        &self,
        identity: &RequestIdentity,
    ) -> Result<PaymentSessionHandle, ServiceError> {
        let session = self
            .get_or_create_from_request(identity, CheckoutRequest::default())
            .await?;

        let owner = identity.owner();
        let (session, cart) = self.owned_session(&*self.db, &owner, session.id).await?;
        let priced = self.carts.priced_cart(&*self.db, &cart).await?;
        Self::validate_for_payment(&session, &cart, &priced)?;

        let mut line_items = Vec::with_capacity(priced.items.len());
        for item in &priced.items {
            let product = Product::find_by_id(item.product.id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product.id))
                })?;
            if product.stripe_price_id.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is not configured for payment",
                    product.name
                )));
            }
            line_items.push(PaymentLineItem {
                price_id: product.stripe_price_id,
                quantity: item.quantity,
            });
        }

        // Only a currently-valid discount is forwarded as a coupon
        let coupon_id = match &priced.discount {
            Some(summary) if priced.is_discount_valid => {
                let discount = crate::entities::Discount::find_by_id(summary.id)
                    .one(&*self.db)
                    .await?;
                discount
                    .filter(|d| d.is_valid(Utc::now()))
                    .map(|d| d.stripe_id)
            }
            _ => None,
        };

        let shipping_option = match session.shipping_option_id {
            Some(id) => {
                let option = ShippingOption::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Shipping option {} not found", id))
                    })?;
                let terms = ShippingTerms {
                    delivery_speed: option.delivery_speed.clone(),
                    price_minor_units: option.price_minor_units,
                };
                let cost = pricing::shipping_cost(
                    Some(&terms),
                    priced.discounted_total,
                    self.config.free_shipping_threshold,
                );
                let amount_minor_units = if cost.is_zero() {
                    0
                } else {
                    i64::from(option.price_minor_units)
                };
                Some(PaymentShippingOption {
                    display_name: option.name,
                    amount_minor_units,
                    currency: self.config.currency.clone(),
                    estimated_days_min: option.estimated_days_min,
                    estimated_days_max: option.estimated_days_max,
                })
            }
            None => None,
        };

        let request = CreatePaymentSessionRequest {
            line_items,
            customer_email: session.email.clone(),
            currency: self.config.currency.clone(),
            coupon_id,
            shipping_option,
            success_url: format!(
                "{}/checkout/success?session_id={}",
                self.config.frontend_url, session.id
            ),
            cancel_url: format!(
                "{}/checkout/cancel?session_id={}",
                self.config.frontend_url, session.id
            ),
            checkout_session_id: session.id,
            expires_at: Utc::now() + Duration::minutes(self.config.payment_session_expiry_mins),
        };

        let handle = self.payment_client.create_checkout_session(request).await?;

        let mut active: checkout_session::ActiveModel = session.into();
        active.stripe_session_id = Set(Some(handle.id.clone()));
        active.updated_at = Set(Utc::now());
        let session = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentSessionCreated {
                session_id: session.id,
            })
            .await;
        info!(checkout_session_id = %session.id, processor_session_id = %handle.id, "external payment session created");
        Ok(handle)
    }
}

/// Request body for `POST /checkout`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutDetailsInput {
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShippingOptionSummary {
    pub id: Uuid,
    pub name: String,
    pub delivery_speed: String,
    pub price: Decimal,
    pub estimated_days_min: i16,
    pub estimated_days_max: i16,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSummary {
    pub id: Uuid,
    pub payment_status: PaymentStatus,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub shipping_option: Option<ShippingOptionSummary>,
    pub shipping_cost: Decimal,
    pub total_with_shipping: Decimal,
    pub cart: PricedCart,
}
