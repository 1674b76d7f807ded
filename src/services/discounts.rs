use crate::{
    entities::{discount, discount_exclusion, Discount, DiscountExclusion},
    errors::ServiceError,
    services::pricing::{self, LineInput},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Discount code evaluation, split out of the cart service so the rules
/// stay testable on their own.
#[derive(Clone)]
pub struct DiscountService {
    db: Arc<DatabaseConnection>,
}

/// Outcome of validating a code against a cart.
#[derive(Debug, Clone)]
pub struct DiscountValidation {
    pub discount: discount::Model,
    pub excluded_products: HashSet<Uuid>,
    pub eligible_total: rust_decimal::Decimal,
    /// How many of the cart's lines actually contribute to the discount
    pub eligible_items: usize,
    pub total_items: usize,
    pub message: String,
}

impl DiscountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a discount by code, matched case-insensitively.
    pub async fn find_by_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<Option<discount::Model>, ServiceError> {
        // Codes are stored uppercase by convention but matched without case
        let all = Discount::find()
            .filter(discount::Column::Active.eq(true))
            .all(conn)
            .await?;
        Ok(all
            .into_iter()
            .find(|d| d.code.eq_ignore_ascii_case(code.trim())))
    }

    /// Load the product exclusion set for a discount.
    pub async fn exclusions_for<C: ConnectionTrait>(
        &self,
        conn: &C,
        discount_id: Uuid,
    ) -> Result<HashSet<Uuid>, ServiceError> {
        let rows = DiscountExclusion::find()
            .filter(discount_exclusion::Column::DiscountId.eq(discount_id))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.product_id).collect())
    }

    /// Validate `code` against the given cart lines.
    ///
    /// Fails when the code is unknown, outside its date window or inactive,
    /// or when the eligible subtotal (excluded products removed) falls
    /// short of the minimum order value. The cart's discount reference is
    /// untouched on failure.
    #[instrument(skip(self, lines), fields(code = %code))]
    pub async fn validate_for_cart(
        &self,
        code: &str,
        lines: &[LineInput],
    ) -> Result<DiscountValidation, ServiceError> {
        self.validate_for_cart_on(&*self.db, code, lines).await
    }

    /// Same as [`validate_for_cart`], on an explicit connection so it can
    /// run inside the caller's transaction.
    pub async fn validate_for_cart_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        lines: &[LineInput],
    ) -> Result<DiscountValidation, ServiceError> {
        let now = Utc::now();
        let discount = self
            .find_by_code(conn, code)
            .await?
            .filter(|d| d.is_valid(now))
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("Discount code {} is invalid or expired", code))
            })?;

        let excluded_products = self.exclusions_for(conn, discount.id).await?;
        let eligible_total = pricing::eligible_subtotal(lines, &excluded_products);

        if eligible_total < discount.min_order_value {
            return Err(ServiceError::BadRequest(format!(
                "A minimum order of {} is required to use this discount (eligible items total {})",
                discount.min_order_value, eligible_total
            )));
        }

        let total_items = lines.len();
        let eligible_items = lines
            .iter()
            .filter(|l| !excluded_products.contains(&l.product_id))
            .count();

        let message = if eligible_items == total_items {
            format!("Discount {} applied to your cart", discount.code)
        } else {
            format!(
                "Discount {} applied: {} of {} items are eligible",
                discount.code, eligible_items, total_items
            )
        };

        info!(
            discount_id = %discount.id,
            %eligible_total,
            eligible_items,
            total_items,
            "discount validated"
        );

        Ok(DiscountValidation {
            excluded_products,
            eligible_total,
            eligible_items,
            total_items,
            message,
            discount,
        })
    }
}
