mod common;

use assert_matches::assert_matches;
use cacao_api::{
    entities::{DiscountType, PaymentStatus, SelectionType},
    errors::ServiceError,
    services::{
        carts::{AddItemInput, BoxCustomizationInput, FlavorSelectionInput, UpdateCartInput},
        checkout::CheckoutRequest,
    },
};
use common::{guest_identity, user_identity, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn guest_checkout_requires_email() {
    let app = TestApp::new().await;
    let identity = guest_identity();

    let err = app
        .services
        .checkout
        .get_or_create_from_request(&identity, CheckoutRequest { email: None })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) => {
        assert!(msg.to_lowercase().contains("email"), "message was: {}", msg);
    });

    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout with email failed");
    assert_eq!(session.email.as_deref(), Some("guest@example.com"));
    assert_eq!(session.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn user_checkout_snapshots_account_email() {
    let app = TestApp::new().await;
    let identity = user_identity("customer@example.com");

    let session = app
        .services
        .checkout
        .get_or_create_from_request(&identity, CheckoutRequest { email: None })
        .await
        .expect("user checkout failed");
    assert_eq!(session.email.as_deref(), Some("customer@example.com"));
}

#[tokio::test]
async fn pending_session_is_reused_and_email_updated() {
    let app = TestApp::new().await;
    let identity = guest_identity();

    let first = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("first@example.com".to_string()),
            },
        )
        .await
        .expect("first checkout failed");

    let second = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("second@example.com".to_string()),
            },
        )
        .await
        .expect("second checkout failed");

    assert_eq!(first.id, second.id);
    assert_eq!(second.email.as_deref(), Some("second@example.com"));
}

#[tokio::test]
async fn standard_shipping_is_free_at_threshold() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let product = app
        .seed_product("Grand Box", dec!(45.00), 24, "price_grand")
        .await;
    let option = app.seed_shipping_option("Tracked 48", "standard", 499).await;

    app.services
        .carts
        .add_item(
            &identity.owner(),
            AddItemInput {
                product,
                quantity: 1,
                box_customization: None,
            },
        )
        .await
        .expect("add item failed");

    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let summary = app
        .services
        .checkout
        .set_shipping_option(&identity.owner(), session.id, option)
        .await
        .expect("set shipping option failed");

    assert_eq!(summary.shipping_cost, Decimal::ZERO);
    assert_eq!(summary.total_with_shipping, dec!(45.00));
}

#[tokio::test]
async fn standard_shipping_charged_below_threshold() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let product = app
        .seed_product("Small Box", dec!(14.99), 9, "price_small")
        .await;
    let option = app.seed_shipping_option("Tracked 48", "standard", 499).await;

    app.services
        .carts
        .add_item(
            &identity.owner(),
            AddItemInput {
                product,
                quantity: 1,
                box_customization: None,
            },
        )
        .await
        .expect("add item failed");

    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let summary = app
        .services
        .checkout
        .set_shipping_option(&identity.owner(), session.id, option)
        .await
        .expect("set shipping option failed");

    assert_eq!(summary.shipping_cost, dec!(4.99));
    assert_eq!(summary.total_with_shipping, dec!(19.98));
}

#[tokio::test]
async fn express_shipping_never_free_via_threshold() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let product = app
        .seed_product("Grand Box", dec!(60.00), 24, "price_grand")
        .await;
    let option = app.seed_shipping_option("Special 24", "express", 799).await;

    app.services
        .carts
        .add_item(
            &identity.owner(),
            AddItemInput {
                product,
                quantity: 1,
                box_customization: None,
            },
        )
        .await
        .expect("add item failed");

    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let summary = app
        .services
        .checkout
        .set_shipping_option(&identity.owner(), session.id, option)
        .await
        .expect("set shipping option failed");

    assert_eq!(summary.shipping_cost, dec!(7.99));
    assert_eq!(summary.total_with_shipping, dec!(67.99));
}

#[tokio::test]
async fn payment_session_requires_shipping_address_and_items() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    app.seed_product("Small Box", dec!(14.99), 9, "price_small")
        .await;

    // Empty cart, no address: session exists but payment creation refuses
    app.services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let err = app
        .services
        .checkout
        .create_payment_session(&identity)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert!(app.payments.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn payment_session_quotes_cart_to_processor() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let owner = identity.owner();
    let product = app
        .seed_product("Grand Box", dec!(60.00), 24, "price_grand")
        .await;
    app.seed_discount(
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Decimal::ZERO,
        &[],
    )
    .await;
    let option = app.seed_shipping_option("Tracked 48", "standard", 499).await;

    app.services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product,
                quantity: 2,
                box_customization: None,
            },
        )
        .await
        .expect("add item failed");
    app.services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("SAVE10".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("apply discount failed");

    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let address = app
        .services
        .addresses
        .create(
            &owner,
            cacao_api::services::addresses::AddressInput {
                address_type: cacao_api::entities::AddressType::Shipping,
                first_name: "Maya".to_string(),
                last_name: "Bloom".to_string(),
                phone: "07700900000".to_string(),
                street_address: "1 Cocoa Lane".to_string(),
                street_address2: None,
                city: "London".to_string(),
                county: None,
                postcode: "E1 6AN".to_string(),
                country: None,
                is_default: true,
            },
        )
        .await
        .expect("address create failed");

    app.services
        .checkout
        .set_details(
            &owner,
            session.id,
            cacao_api::services::checkout::CheckoutDetailsInput {
                shipping_address_id: Some(address.id),
                billing_address_id: None,
                email: None,
                phone: None,
            },
        )
        .await
        .expect("set details failed");
    app.services
        .checkout
        .set_shipping_option(&owner, session.id, option)
        .await
        .expect("set shipping option failed");

    let handle = app
        .services
        .checkout
        .create_payment_session(&identity)
        .await
        .expect("payment session failed");
    assert!(handle.url.starts_with("https://pay.example/"));

    let requests = app.payments.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.checkout_session_id, session.id);
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.line_items[0].price_id, "price_grand");
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(request.coupon_id.as_deref(), Some("coupon_save10"));
    assert_eq!(request.customer_email.as_deref(), Some("guest@example.com"));

    // 120 base, 10% off → 108 ≥ 45: standard shipping quotes as free
    let shipping = request.shipping_option.as_ref().expect("shipping missing");
    assert_eq!(shipping.amount_minor_units, 0);
}

#[tokio::test]
async fn processor_failure_surfaces_as_external_error() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let owner = identity.owner();
    let product = app
        .seed_product("Small Box", dec!(14.99), 9, "price_small")
        .await;

    app.services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product,
                quantity: 1,
                box_customization: None,
            },
        )
        .await
        .expect("add item failed");
    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    let address = app
        .services
        .addresses
        .create(
            &owner,
            cacao_api::services::addresses::AddressInput {
                address_type: cacao_api::entities::AddressType::Shipping,
                first_name: "Maya".to_string(),
                last_name: "Bloom".to_string(),
                phone: "07700900000".to_string(),
                street_address: "1 Cocoa Lane".to_string(),
                street_address2: None,
                city: "London".to_string(),
                county: None,
                postcode: "E1 6AN".to_string(),
                country: None,
                is_default: false,
            },
        )
        .await
        .expect("address create failed");
    app.services
        .checkout
        .set_details(
            &owner,
            session.id,
            cacao_api::services::checkout::CheckoutDetailsInput {
                shipping_address_id: Some(address.id),
                billing_address_id: None,
                email: None,
                phone: None,
            },
        )
        .await
        .expect("set details failed");

    app.payments
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let err = app
        .services
        .checkout
        .create_payment_session(&identity)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(_));
}

#[tokio::test]
async fn end_to_end_guest_purchase() {
    let app = TestApp::new().await;
    let identity = guest_identity();
    let owner = identity.owner();

    // Product with a 12-piece pick-and-mix box
    let product = app
        .seed_product("Signature Box", dec!(50.00), 12, "price_sig")
        .await;
    let dark = app.seed_flavour("Dark Chocolate").await;
    let milk = app.seed_flavour("Milk Chocolate").await;
    app.seed_discount(
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Decimal::ZERO,
        &[],
    )
    .await;
    let option = app.seed_shipping_option("Tracked 48", "standard", 499).await;

    // Add 6+6 pick-and-mix
    let cart = app
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product,
                quantity: 1,
                box_customization: Some(BoxCustomizationInput {
                    selection_type: SelectionType::PickAndMix,
                    allergens: vec![],
                    flavor_selections: vec![
                        FlavorSelectionInput {
                            flavour: dark,
                            quantity: 6,
                        },
                        FlavorSelectionInput {
                            flavour: milk,
                            quantity: 6,
                        },
                    ],
                }),
            },
        )
        .await
        .expect("add item failed");
    assert_eq!(cart.base_total, dec!(50.00));

    // Apply SAVE10 → 45.00
    let (cart, _) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("SAVE10".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("apply discount failed");
    assert_eq!(cart.discounted_total, dec!(45.00));

    // Checkout session with guest email
    let session = app
        .services
        .checkout
        .get_or_create_from_request(
            &identity,
            CheckoutRequest {
                email: Some("guest@example.com".to_string()),
            },
        )
        .await
        .expect("checkout failed");

    // Standard shipping, threshold met → free, grand total unchanged
    let summary = app
        .services
        .checkout
        .set_shipping_option(&owner, session.id, option)
        .await
        .expect("set shipping option failed");
    assert_eq!(summary.shipping_cost, Decimal::ZERO);
    assert_eq!(summary.total_with_shipping, dec!(45.00));

    // Simulate the processor's completed webhook
    let payload = serde_json::json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_live_1",
                "payment_intent": "pi_1",
                "metadata": { "checkout_session_id": session.id.to_string() }
            }
        }
    });
    let event =
        cacao_api::services::webhooks::WebhookProcessor::parse_event(payload.to_string().as_bytes())
            .expect("parse failed");
    app.services
        .webhooks
        .process(event)
        .await
        .expect("webhook processing failed");

    // Order exists in processing, cart retired, confirmation sent
    let (orders, total) = app
        .services
        .orders
        .list_for_owner(&owner, 1, 20)
        .await
        .expect("order list failed");
    assert_eq!(total, 1);
    assert_eq!(orders[0].status, cacao_api::entities::OrderStatus::Processing);
    assert_eq!(orders[0].email.as_deref(), Some("guest@example.com"));

    let cart = app
        .services
        .carts
        .current_priced_cart(&owner)
        .await
        .expect("priced cart failed");
    // A fresh active cart replaces the retired one
    assert!(cart.items.is_empty());

    assert_eq!(app.mailer.sent.load(std::sync::atomic::Ordering::SeqCst), 1);
}
