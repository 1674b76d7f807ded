use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shopping cart aggregate root.
///
/// Exactly one of `user_id` / `session_id` is set at creation; ownership
/// never transfers between them. At most one `active = true` cart exists
/// per owner at any committed point in time (enforced by the cart service
/// under the owner-key lock, not by a uniqueness constraint).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(nullable)]
    pub user_id: Option<Uuid>,
    #[sea_orm(nullable, indexed)]
    pub session_id: Option<String>,
    #[sea_orm(nullable)]
    pub discount_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub gift_message: Option<String>,
    #[sea_orm(nullable)]
    pub shipping_date: Option<Date>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::discount::Entity",
        from = "Column::DiscountId",
        to = "super::discount::Column::Id"
    )]
    Discount,
    #[sea_orm(has_many = "super::checkout_session::Entity")]
    CheckoutSessions,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discount.def()
    }
}

impl Related<super::checkout_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
