use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DiscountType {
    #[sea_orm(string_value = "PERCENTAGE")]
    Percentage,
    #[sea_orm(string_value = "FIXED_AMOUNT")]
    FixedAmount,
}

/// Lifecycle status derived from the `active` flag and the date window.
/// Never stored; only a discount whose derived status is `Active` may be
/// applied to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountStatus {
    Inactive,
    Scheduled,
    Expired,
    Active,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    /// Code customers enter; matched case-insensitively
    #[sea_orm(unique)]
    pub code: String,
    /// Payment-processor coupon id
    pub stripe_id: String,
    pub discount_type: DiscountType,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub min_order_value: Decimal,
    #[sea_orm(nullable)]
    pub start_date: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Derived lifecycle status at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> DiscountStatus {
        if !self.active {
            return DiscountStatus::Inactive;
        }
        if let Some(start) = self.start_date {
            if start > now {
                return DiscountStatus::Scheduled;
            }
        }
        if let Some(end) = self.end_date {
            if end < now {
                return DiscountStatus::Expired;
            }
        }
        DiscountStatus::Active
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == DiscountStatus::Active
    }

    /// Write-time consistency rules for a discount row.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start >= end {
                return Err("End date must be after start date".to_string());
            }
        }
        if self.discount_type == DiscountType::Percentage && self.amount > Decimal::from(100) {
            return Err("Percentage discount cannot be greater than 100%".to_string());
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart::Entity")]
    Carts,
    #[sea_orm(has_many = "super::discount_exclusion::Entity")]
    Exclusions,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carts.def()
    }
}

impl Related<super::discount_exclusion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exclusions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn base_discount() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            title: "Welcome".into(),
            code: "WELCOME10".into(),
            stripe_id: "coupon_welcome10".into(),
            discount_type: DiscountType::Percentage,
            amount: dec!(10),
            min_order_value: Decimal::ZERO,
            start_date: None,
            end_date: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_is_active_without_window() {
        let now = Utc::now();
        assert_eq!(base_discount().status(now), DiscountStatus::Active);
    }

    #[test]
    fn status_inactive_wins_over_window() {
        let now = Utc::now();
        let mut d = base_discount();
        d.active = false;
        d.start_date = Some(now - Duration::days(1));
        d.end_date = Some(now + Duration::days(1));
        assert_eq!(d.status(now), DiscountStatus::Inactive);
    }

    #[test]
    fn status_scheduled_before_start() {
        let now = Utc::now();
        let mut d = base_discount();
        d.start_date = Some(now + Duration::hours(1));
        assert_eq!(d.status(now), DiscountStatus::Scheduled);
        assert!(!d.is_valid(now));
    }

    #[test]
    fn status_expired_after_end() {
        let now = Utc::now();
        let mut d = base_discount();
        d.end_date = Some(now - Duration::hours(1));
        assert_eq!(d.status(now), DiscountStatus::Expired);
        assert!(!d.is_valid(now));
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let now = Utc::now();
        let mut d = base_discount();
        d.start_date = Some(now + Duration::days(2));
        d.end_date = Some(now + Duration::days(1));
        assert!(d.validate().is_err());
    }

    #[test]
    fn validate_rejects_over_100_percent() {
        let mut d = base_discount();
        d.amount = dec!(150);
        assert!(d.validate().is_err());
        d.discount_type = DiscountType::FixedAmount;
        assert!(d.validate().is_ok());
    }
}
