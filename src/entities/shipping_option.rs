use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A priced delivery service offered by a carrier.
///
/// `price_minor_units` (pence) is what gets quoted to the payment
/// processor; `price` is the display value.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// e.g. "standard", "express"
    pub delivery_speed: String,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub price: Decimal,
    pub price_minor_units: i32,
    pub estimated_days_min: i16,
    pub estimated_days_max: i16,
    #[sea_orm(unique)]
    pub service_code: String,
    pub active: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipping_company::Entity",
        from = "Column::CompanyId",
        to = "super::shipping_company::Column::Id"
    )]
    Company,
    #[sea_orm(has_many = "super::checkout_session::Entity")]
    CheckoutSessions,
}

impl Related<super::shipping_company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::checkout_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
