mod common;

use assert_matches::assert_matches;
use cacao_api::{
    entities::{cart, Cart, DiscountType, SelectionType},
    errors::ServiceError,
    identity::CartOwner,
    services::carts::{
        AddItemInput, BoxCustomizationInput, FlavorSelectionInput, UpdateCartInput,
    },
};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

fn session_owner() -> CartOwner {
    CartOwner::Session(cacao_api::identity::mint_session_token())
}

#[tokio::test]
async fn get_or_create_returns_same_cart() {
    let app = TestApp::new().await;
    let owner = session_owner();

    let (cart, was_created) = app
        .services
        .carts
        .get_or_create_active_cart(&owner)
        .await
        .expect("first get-or-create failed");
    assert!(was_created);
    assert!(cart.active);
    assert!(cart.user_id.is_none());

    let (again, was_created) = app
        .services
        .carts
        .get_or_create_active_cart(&owner)
        .await
        .expect("second get-or-create failed");
    assert!(!was_created);
    assert_eq!(again.id, cart.id);
}

#[tokio::test]
async fn concurrent_first_touch_creates_one_cart() {
    let app = TestApp::new().await;
    let owner = session_owner();

    let carts = app.services.carts.clone();
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let carts = carts.clone();
            let owner = owner.clone();
            tokio::spawn(async move { carts.get_or_create_active_cart(&owner).await })
        })
        .collect();

    let mut ids = Vec::new();
    let mut created_count = 0;
    for task in tasks {
        let (cart, was_created) = task
            .await
            .expect("task panicked")
            .expect("get-or-create failed");
        ids.push(cart.id);
        if was_created {
            created_count += 1;
        }
    }

    assert_eq!(created_count, 1, "exactly one request should create");
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let token = match owner {
        CartOwner::Session(ref t) => t.clone(),
        _ => unreachable!(),
    };
    let active_count = Cart::find()
        .filter(cart::Column::SessionId.eq(token))
        .filter(cart::Column::Active.eq(true))
        .all(&*app.db)
        .await
        .expect("query failed")
        .len();
    assert_eq!(active_count, 1);
}

#[tokio::test]
async fn session_cart_never_aliases_user_cart() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let (user_cart, _) = app
        .services
        .carts
        .get_or_create_active_cart(&CartOwner::User(user_id))
        .await
        .expect("user cart failed");

    let (session_cart, _) = app
        .services
        .carts
        .get_or_create_active_cart(&CartOwner::Session("tok-distinct".to_string()))
        .await
        .expect("session cart failed");

    assert_ne!(user_cart.id, session_cart.id);
    assert_eq!(user_cart.user_id, Some(user_id));
    assert!(session_cart.user_id.is_none());
}

#[tokio::test]
async fn add_item_prices_cart() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Signature Box", dec!(14.99), 9, "price_sig")
        .await;

    let cart = app
        .services
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

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.base_total, dec!(29.98));
    assert_eq!(cart.discounted_total, dec!(29.98));
    assert_eq!(cart.total_savings, Decimal::ZERO);
}

#[tokio::test]
async fn add_item_rejects_zero_quantity() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Signature Box", dec!(14.99), 9, "price_sig")
        .await;

    let err = app
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product,
                quantity: 0,
                box_customization: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn add_item_rejects_unknown_product() {
    let app = TestApp::new().await;
    let owner = session_owner();

    let err = app
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product: Uuid::new_v4(),
                quantity: 1,
                box_customization: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn pick_and_mix_must_fill_the_box() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Nine Piece", dec!(14.99), 9, "price_nine")
        .await;
    let dark = app.seed_flavour("Dark Chocolate").await;
    let milk = app.seed_flavour("Milk Chocolate").await;

    let err = app
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
                            quantity: 4,
                        },
                        FlavorSelectionInput {
                            flavour: milk,
                            quantity: 4,
                        },
                    ],
                }),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) => {
        assert!(msg.contains('9'), "expected units in message: {}", msg);
        assert!(msg.contains('8'), "actual total in message: {}", msg);
    });

    // Nothing half-written
    let cart = app
        .services
        .carts
        .current_priced_cart(&owner)
        .await
        .expect("priced cart failed");
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn pick_and_mix_exact_fill_round_trips() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Twelve Piece", dec!(19.99), 12, "price_twelve")
        .await;
    let dark = app.seed_flavour("Dark Chocolate").await;
    let milk = app.seed_flavour("Milk Chocolate").await;

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

    let customization = cart.items[0]
        .box_customization
        .as_ref()
        .expect("customization missing");
    assert_eq!(customization.selection_type, SelectionType::PickAndMix);
    assert_eq!(customization.flavor_selections.len(), 2);
    assert_eq!(cart.base_total, dec!(19.99));
}

#[tokio::test]
async fn random_box_rejects_flavor_selections() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Random Box", dec!(14.99), 9, "price_rand")
        .await;
    let dark = app.seed_flavour("Dark Chocolate").await;

    let err = app
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product,
                quantity: 1,
                box_customization: Some(BoxCustomizationInput {
                    selection_type: SelectionType::Random,
                    allergens: vec![],
                    flavor_selections: vec![FlavorSelectionInput {
                        flavour: dark,
                        quantity: 9,
                    }],
                }),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn update_and_remove_item_are_ownership_checked() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let intruder = session_owner();
    let product = app
        .seed_product("Signature Box", dec!(14.99), 9, "price_sig")
        .await;

    let cart = app
        .services
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
    let item_id = cart.items[0].id;

    // Someone else's session cannot touch the item
    let err = app
        .services
        .carts
        .update_item_quantity(&intruder, item_id, 3)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .carts
        .remove_item(&intruder, item_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // The owner can
    let cart = app
        .services
        .carts
        .update_item_quantity(&owner, item_id, 3)
        .await
        .expect("update failed");
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.base_total, dec!(44.97));

    let cart = app
        .services
        .carts
        .remove_item(&owner, item_id)
        .await
        .expect("remove failed");
    assert!(cart.items.is_empty());
    assert_eq!(cart.base_total, Decimal::ZERO);
}

#[tokio::test]
async fn percentage_discount_excludes_products() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let excluded = app
        .seed_product("Excluded Box", dec!(30.00), 9, "price_a")
        .await;
    let eligible = app
        .seed_product("Eligible Box", dec!(20.00), 9, "price_b")
        .await;
    app.seed_discount(
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Decimal::ZERO,
        &[excluded],
    )
    .await;

    for product in [excluded, eligible] {
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
    }

    let (cart, message) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("save10".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("apply discount failed");

    // base 50, only the 20 line is reduced by 10%
    assert_eq!(cart.base_total, dec!(50.00));
    assert_eq!(cart.discounted_total, dec!(48.00));
    assert_eq!(cart.total_savings, dec!(2.00));
    assert!(cart.is_discount_valid);
    let message = message.expect("expected eligibility message");
    assert!(message.contains("1 of 2"), "message was: {}", message);
}

#[tokio::test]
async fn fixed_amount_discount_ignores_exclusions() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Only Box", dec!(30.00), 9, "price_a")
        .await;
    app.seed_discount(
        "FIVER",
        DiscountType::FixedAmount,
        dec!(5.00),
        Decimal::ZERO,
        &[product],
    )
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

    let (cart, _) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("FIVER".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("apply discount failed");

    // Exclusions are not consulted for fixed-amount discounts
    assert_eq!(cart.discounted_total, dec!(25.00));
    assert_eq!(cart.total_savings, dec!(5.00));
}

#[tokio::test]
async fn discount_below_minimum_is_rejected_and_cart_unchanged() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Small Box", dec!(40.00), 9, "price_small")
        .await;
    app.seed_discount(
        "BIG50",
        DiscountType::Percentage,
        dec!(20),
        dec!(50.00),
        &[],
    )
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

    let err = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("BIG50".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::BadRequest(msg) => {
        assert!(msg.contains("50"), "minimum missing from: {}", msg);
    });

    let cart = app
        .services
        .carts
        .current_priced_cart(&owner)
        .await
        .expect("priced cart failed");
    assert!(cart.discount.is_none());
    assert_eq!(cart.discounted_total, dec!(40.00));
}

#[tokio::test]
async fn unknown_discount_code_is_rejected() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Small Box", dec!(40.00), 9, "price_small")
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

    let err = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("NOPE".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::BadRequest(_));
}

#[tokio::test]
async fn partial_update_leaves_discount_untouched() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Small Box", dec!(40.00), 9, "price_small")
        .await;
    app.seed_discount(
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Decimal::ZERO,
        &[],
    )
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

    // A later update that says nothing about the discount keeps it
    let (cart, _) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                gift_message: Some("Happy Birthday!".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("gift message update failed");
    assert!(cart.discount.is_some());
    assert_eq!(cart.gift_message.as_deref(), Some("Happy Birthday!"));
    assert_eq!(cart.discounted_total, dec!(36.00));

    // The explicit flag removes it
    let (cart, _) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                remove_discount: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("remove discount failed");
    assert!(cart.discount.is_none());
    assert_eq!(cart.discounted_total, dec!(40.00));
}

#[tokio::test]
async fn empty_code_also_removes_discount() {
    let app = TestApp::new().await;
    let owner = session_owner();
    let product = app
        .seed_product("Small Box", dec!(40.00), 9, "price_small")
        .await;
    app.seed_discount(
        "SAVE10",
        DiscountType::Percentage,
        dec!(10),
        Decimal::ZERO,
        &[],
    )
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

    let (cart, _) = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                discount_code: Some("".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("empty code update failed");
    assert!(cart.discount.is_none());
}

#[tokio::test]
async fn past_shipping_date_is_rejected() {
    let app = TestApp::new().await;
    let owner = session_owner();

    let err = app
        .services
        .carts
        .update_details(
            &owner,
            UpdateCartInput {
                shipping_date: Some(
                    chrono::Utc::now().date_naive() - chrono::Duration::days(1),
                ),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
