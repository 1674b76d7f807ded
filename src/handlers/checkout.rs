use crate::handlers::common::{map_service_error, success_response};
use crate::{
    errors::ApiError,
    identity::{apply_session_cookie, RequestIdentity},
    services::checkout::{CheckoutDetailsInput, CheckoutRequest},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(start_checkout))
        .route("/{session_id}", get(get_checkout))
        .route("/{session_id}/shipping-option", post(set_shipping_option))
        .route("/{session_id}/details", post(set_details))
        .route("/payment/create-session", post(create_payment_session))
}

/// Get-or-create the checkout session for the current cart
async fn start_checkout(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    payload: Option<Json<StartCheckoutRequest>>,
) -> Result<Response, ApiError> {
    let email = payload.and_then(|Json(p)| p.email);
    let session = state
        .services
        .checkout
        .get_or_create_from_request(&identity, CheckoutRequest { email })
        .await
        .map_err(map_service_error)?;

    let summary = state
        .services
        .checkout
        .summary(&identity.owner(), session.id)
        .await
        .map_err(map_service_error)?;

    Ok(apply_session_cookie(&identity, success_response(summary)))
}

/// Current session state with the re-priced cart
async fn get_checkout(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let summary = state
        .services
        .checkout
        .summary(&identity.owner(), session_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

/// Choose a shipping option
async fn set_shipping_option(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SetShippingOptionRequest>,
) -> Result<Response, ApiError> {
    let summary = state
        .services
        .checkout
        .set_shipping_option(&identity.owner(), session_id, payload.shipping_option)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

/// Attach addresses and contact details
async fn set_details(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<CheckoutDetailsInput>,
) -> Result<Response, ApiError> {
    let summary = state
        .services
        .checkout
        .set_details(&identity.owner(), session_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

/// Create the external payment session and return the redirect URL
async fn create_payment_session(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
) -> Result<Response, ApiError> {
    let handle = state
        .services
        .checkout
        .create_payment_session(&identity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({ "url": handle.url })))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct StartCheckoutRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetShippingOptionRequest {
    pub shipping_option: Uuid,
}
