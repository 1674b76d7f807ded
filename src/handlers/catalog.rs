use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

/// Read-only catalog endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/{slug}", get(get_product))
}

pub fn flavours_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_flavours))
}

pub fn allergens_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_allergens))
}

pub fn shipping_routes() -> Router<Arc<AppState>> {
    Router::new().route("/options", get(list_shipping_options))
}

async fn list_products(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let products = state
        .services
        .catalog
        .list_products()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let product = state
        .services
        .catalog
        .get_product_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn list_flavours(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let flavours = state
        .services
        .catalog
        .list_flavours()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(flavours))
}

async fn list_allergens(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let allergens = state
        .services
        .catalog
        .list_allergens()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(allergens))
}

async fn list_shipping_options(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let options = state
        .services
        .catalog
        .list_shipping_options()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(options))
}
