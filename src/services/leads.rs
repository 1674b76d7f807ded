use crate::{
    entities::{lead, Lead, LeadType},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Newsletter/contact lead capture, idempotent on (email, type).
#[derive(Clone)]
pub struct LeadService {
    db: Arc<DatabaseConnection>,
}

impl LeadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn capture(
        &self,
        email: &str,
        lead_type: LeadType,
    ) -> Result<(lead::Model, bool), ServiceError> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() || !normalized.contains('@') {
            return Err(ServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }

        if let Some(existing) = Lead::find()
            .filter(lead::Column::Email.eq(normalized.clone()))
            .filter(lead::Column::LeadType.eq(lead_type))
            .one(&*self.db)
            .await?
        {
            return Ok((existing, false));
        }

        let lead = lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(normalized),
            lead_type: Set(lead_type),
            unsubscribed: Set(false),
            created_at: Set(Utc::now()),
        };
        let lead = lead.insert(&*self.db).await?;
        info!(lead_id = %lead.id, "lead captured");
        Ok((lead, true))
    }
}
