use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an assortment box is filled: randomly by the kitchen or picked
/// flavour-by-flavour by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum SelectionType {
    #[sea_orm(string_value = "RANDOM")]
    Random,
    #[sea_orm(string_value = "PICK_AND_MIX")]
    PickAndMix,
}

/// One-to-one customization attached to a cart item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_item_box_customizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub cart_item_id: Uuid,
    pub selection_type: SelectionType,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart_item::Entity",
        from = "Column::CartItemId",
        to = "super::cart_item::Column::Id"
    )]
    CartItem,
    #[sea_orm(has_many = "super::box_flavor_selection::Entity")]
    FlavorSelections,
    #[sea_orm(has_many = "super::box_customization_allergen::Entity")]
    Allergens,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl Related<super::box_flavor_selection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlavorSelections.def()
    }
}

impl Related<super::box_customization_allergen::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allergens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
