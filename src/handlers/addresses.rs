use crate::handlers::common::{created_response, map_service_error, no_content_response, success_response};
use crate::{
    errors::ApiError,
    identity::{apply_session_cookie, RequestIdentity},
    services::addresses::AddressInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for address-book endpoints
pub fn addresses_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_addresses))
        .route("/", post(create_address))
        .route("/{id}", put(update_address))
        .route("/{id}", delete(delete_address))
}

async fn list_addresses(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
) -> Result<Response, ApiError> {
    let addresses = state
        .services
        .addresses
        .list(&identity.owner())
        .await
        .map_err(map_service_error)?;
    Ok(apply_session_cookie(&identity, success_response(addresses)))
}

async fn create_address(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Json(payload): Json<AddressInput>,
) -> Result<Response, ApiError> {
    let address = state
        .services
        .addresses
        .create(&identity.owner(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(apply_session_cookie(&identity, created_response(address)))
}

async fn update_address(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<Response, ApiError> {
    let address = state
        .services
        .addresses
        .update(&identity.owner(), id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}

async fn delete_address(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .addresses
        .delete(&identity.owner(), id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
