use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    identity::{apply_session_cookie, RequestIdentity},
    services::carts::{
        AddItemInput, BoxCustomizationInput, PricedCart, UpdateCartInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", post(update_cart))
        .route("/items", post(add_item))
        .route("/items/{item_id}", patch(update_item))
        .route("/items/{item_id}", delete(remove_item))
}

/// Get-or-create the current cart, fully priced
async fn get_cart(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .current_priced_cart(&identity.owner())
        .await
        .map_err(map_service_error)?;

    Ok(apply_session_cookie(&identity, success_response(cart)))
}

/// Partial update: gift message, shipping date, discount code
async fn update_cart(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Response, ApiError> {
    let input = UpdateCartInput {
        gift_message: payload.gift_message,
        shipping_date: payload.shipping_date,
        discount_code: payload.discount_code,
        remove_discount: payload.remove_discount,
    };

    let (cart, message) = state
        .services
        .carts
        .update_details(&identity.owner(), input)
        .await
        .map_err(map_service_error)?;

    let body = CartUpdateResponse { cart, message };
    Ok(apply_session_cookie(&identity, success_response(body)))
}

/// Add an item (with optional box customization) to the cart
async fn add_item(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Json(payload): Json<AddItemRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let input = AddItemInput {
        product: payload.product,
        quantity: payload.quantity,
        box_customization: payload.box_customization,
    };

    let cart = state
        .services
        .carts
        .add_item(&identity.owner(), input)
        .await
        .map_err(map_service_error)?;

    let response = (axum::http::StatusCode::CREATED, axum::Json(cart)).into_response();
    Ok(apply_session_cookie(&identity, response))
}

/// Update an item's quantity
async fn update_item(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .carts
        .update_item_quantity(&identity.owner(), item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(apply_session_cookie(&identity, success_response(cart)))
}

/// Remove an item; the re-priced cart comes back
async fn remove_item(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(item_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .remove_item(&identity.owner(), item_id)
        .await
        .map_err(map_service_error)?;

    Ok(apply_session_cookie(&identity, success_response(cart)))
}

// Request/response DTOs

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub gift_message: Option<String>,
    pub shipping_date: Option<NaiveDate>,
    pub discount_code: Option<String>,
    pub remove_discount: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub box_customization: Option<BoxCustomizationInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartUpdateResponse {
    pub cart: PricedCart,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
