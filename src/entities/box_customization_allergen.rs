use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Join row: an allergen to keep out of a customized box.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_item_box_customization_allergens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub box_customization_id: Uuid,
    pub allergen_id: Uuid,
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
        belongs_to = "super::allergen::Entity",
        from = "Column::AllergenId",
        to = "super::allergen::Column::Id"
    )]
    Allergen,
}

impl Related<super::box_customization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BoxCustomization.def()
    }
}

impl Related<super::allergen::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allergen.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
