use crate::handlers::common::{
    map_service_error, success_response, PaginatedResponse, PaginationParams,
};
use crate::{errors::ApiError, identity::RequestIdentity, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{reference}", get(get_order))
}

/// The caller's orders, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (orders, total) = state
        .services
        .orders
        .list_for_owner(&identity.owner(), pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// One order by its human-readable reference
async fn get_order(
    State(state): State<Arc<AppState>>,
    identity: RequestIdentity,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .get_by_reference(&identity.owner(), &reference)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
