use crate::{
    entities::{
        allergen, flavour, product, shipping_option, Allergen, Flavour, Product, ShippingCompany,
        ShippingOption,
    },
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Read-only access to the reference catalogs: products, flavours,
/// allergens and shipping options.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::BasePrice)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_product_by_slug(&self, slug: &str) -> Result<product::Model, ServiceError> {
        Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::Active.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn list_flavours(&self) -> Result<Vec<flavour::Model>, ServiceError> {
        Ok(Flavour::find()
            .filter(flavour::Column::Active.eq(true))
            .order_by_asc(flavour::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_allergens(&self) -> Result<Vec<allergen::Model>, ServiceError> {
        Ok(Allergen::find()
            .order_by_asc(allergen::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Active shipping options with their carrier names.
    pub async fn list_shipping_options(&self) -> Result<Vec<ShippingOptionView>, ServiceError> {
        let rows = ShippingOption::find()
            .filter(shipping_option::Column::Active.eq(true))
            .order_by_asc(shipping_option::Column::Price)
            .find_also_related(ShippingCompany)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(option, company)| ShippingOptionView {
                id: option.id,
                name: option.name,
                company: company.map(|c| c.name).unwrap_or_default(),
                delivery_speed: option.delivery_speed,
                price: option.price,
                estimated_days_min: option.estimated_days_min,
                estimated_days_max: option.estimated_days_max,
                description: option.description,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
pub struct ShippingOptionView {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub delivery_speed: String,
    pub price: rust_decimal::Decimal,
    pub estimated_days_min: i16,
    pub estimated_days_max: i16,
    pub description: String,
}
