use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A flavour + quantity picked for a pick-and-mix box.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_item_box_flavor_selections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub box_customization_id: Uuid,
    pub flavour_id: Uuid,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::box_customization::Entity",
        from = "Column::BoxCustomizationId",
        to = "super::box_customization::Column::Id"
    )]
    BoxCustomization,
    #[sea_orm(
        belongs_to = "super::flavour::Entity",
        from = "Column::FlavourId",
        to = "super::flavour::Column::Id"
    )]
    Flavour,
}

impl Related<super::box_customization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BoxCustomization.def()
    }
}

impl Related<super::flavour::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flavour.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
