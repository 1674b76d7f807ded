use crate::{
    entities::{
        email_record, order, EmailRecord, EmailStatus, EmailTargetKind, EmailType,
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Outbound mail delivery boundary. Rendering and transport live behind
/// this trait; the webhook pipeline only cares whether the send stuck.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_confirmation(
        &self,
        order: &order::Model,
        recipient: &str,
    ) -> Result<(), ServiceError>;
}

/// Default mailer: logs the send. Real delivery is an external concern
/// wired in at startup.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_confirmation(
        &self,
        order: &order::Model,
        recipient: &str,
    ) -> Result<(), ServiceError> {
        info!(order_id = %order.order_id, %recipient, "order confirmation email dispatched");
        Ok(())
    }
}

/// Outcome of an at-most-once send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailOutcome {
    AlreadyRecorded,
    Sent,
    Failed,
}

/// Transactional email bookkeeping: every attempt leaves an
/// `EmailRecord`, and an existing record for the same (type, target)
/// suppresses re-sends on webhook redelivery.
#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send the order confirmation unless a record for this order already
    /// exists. Delivery failure is recorded and reported, never raised:
    /// payment and order state stay authoritative.
    #[instrument(skip(self, conn, order), fields(order_id = %order.order_id))]
    pub async fn send_order_confirmation_once<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &order::Model,
        recipient: Option<&str>,
    ) -> Result<EmailOutcome, ServiceError> {
        let existing = EmailRecord::find()
            .filter(email_record::Column::EmailType.eq(EmailType::OrderPaid))
            .filter(email_record::Column::TargetKind.eq(EmailTargetKind::Order))
            .filter(email_record::Column::TargetId.eq(order.id))
            .one(conn)
            .await?;
        if existing.is_some() {
            info!("confirmation email already recorded, skipping");
            return Ok(EmailOutcome::AlreadyRecorded);
        }

        let Some(recipient) = recipient else {
            warn!("no recipient email available, recording failed attempt");
            self.record(conn, order.id, EmailStatus::Failed, Some("no recipient email"))
                .await?;
            return Ok(EmailOutcome::Failed);
        };

        let record = self.record(conn, order.id, EmailStatus::Pending, None).await?;

        match self.mailer.send_order_confirmation(order, recipient).await {
            Ok(()) => {
                let mut active: email_record::ActiveModel = record.into();
                active.status = Set(EmailStatus::Sent);
                active.sent_at = Set(Some(Utc::now()));
                active.update(conn).await?;
                Ok(EmailOutcome::Sent)
            }
            Err(e) => {
                error!("confirmation email delivery failed: {}", e);
                let mut active: email_record::ActiveModel = record.into();
                active.status = Set(EmailStatus::Failed);
                active.error_message = Set(Some(e.to_string()));
                active.update(conn).await?;
                Ok(EmailOutcome::Failed)
            }
        }
    }

    async fn record<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
        status: EmailStatus,
        error_message: Option<&str>,
    ) -> Result<email_record::Model, ServiceError> {
        let record = email_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            email_type: Set(EmailType::OrderPaid),
            target_kind: Set(EmailTargetKind::Order),
            target_id: Set(order_id),
            status: Set(status),
            error_message: Set(error_message.map(|m| m.to_string())),
            sent_at: Set(None),
            created_at: Set(Utc::now()),
        };
        Ok(record.insert(conn).await?)
    }
}
