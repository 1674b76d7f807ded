use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{entities::LeadType, errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Creates the router for lead capture
pub fn leads_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(create_lead))
}

async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLeadRequest>,
) -> Result<Response, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let (lead, was_created) = state
        .services
        .leads
        .capture(&payload.email, payload.lead_type)
        .await
        .map_err(map_service_error)?;

    if was_created {
        Ok(created_response(lead))
    } else {
        Ok(success_response(lead))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(email)]
    pub email: String,
    pub lead_type: LeadType,
}
