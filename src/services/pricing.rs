//! Pure cart pricing and shipping-cost math.
//!
//! Everything here is a function of its inputs: totals are recomputed on
//! every read and never stored on a row. The cart and checkout services
//! load the rows and hand plain values in.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::discount::DiscountType;

/// Delivery speed eligible for the free-shipping threshold.
pub const STANDARD_DELIVERY_SPEED: &str = "standard";

/// One cart line, reduced to the values pricing needs.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// The product's base price per box
    pub unit_price: Decimal,
}

/// The applied discount, reduced to its pricing terms.
///
/// `valid` is the derived lifecycle status evaluated by the caller at
/// pricing time; an invalid discount prices like no discount at all.
#[derive(Debug, Clone)]
pub struct DiscountTerms {
    pub discount_type: DiscountType,
    pub amount: Decimal,
    pub min_order_value: Decimal,
    pub excluded_products: HashSet<Uuid>,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePricing {
    pub item_id: Uuid,
    pub base_price: Decimal,
    pub discounted_price: Decimal,
    pub savings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPricing {
    pub lines: Vec<LinePricing>,
    pub base_total: Decimal,
    pub discounted_total: Decimal,
    pub total_savings: Decimal,
    /// Whether the discount actually reduced this cart (set, valid, and
    /// the base total meets its minimum order value)
    pub discount_applied: bool,
}

/// Price a cart.
///
/// Percentage discounts are exclusion-aware: only lines whose product is
/// not excluded contribute to the discounted subtotal. Fixed-amount
/// discounts are applied to the cart total without consulting exclusions —
/// an inherited asymmetry that is deliberate and pinned by tests; see
/// DESIGN.md before "fixing" it.
pub fn price_cart(lines: &[LineInput], discount: Option<&DiscountTerms>) -> CartPricing {
    let base_total: Decimal = lines
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();

    let active = discount
        .filter(|d| d.valid && base_total >= d.min_order_value);

    let priced_lines: Vec<LinePricing> = lines
        .iter()
        .map(|l| {
            let base = l.unit_price * Decimal::from(l.quantity);
            let discounted = match active {
                Some(d)
                    if d.discount_type == DiscountType::Percentage
                        && !d.excluded_products.contains(&l.product_id) =>
                {
                    (base * (dec!(100) - d.amount) / dec!(100)).max(Decimal::ZERO)
                }
                // Fixed-amount reductions apply at cart level, not per line
                _ => base,
            };
            LinePricing {
                item_id: l.item_id,
                base_price: base,
                savings: (base - discounted).max(Decimal::ZERO),
                discounted_price: discounted,
            }
        })
        .collect();

    let discounted_total = match active {
        None => base_total,
        Some(d) => match d.discount_type {
            DiscountType::Percentage => {
                let eligible_subtotal: Decimal = lines
                    .iter()
                    .filter(|l| !d.excluded_products.contains(&l.product_id))
                    .map(|l| l.unit_price * Decimal::from(l.quantity))
                    .sum();
                let discount_amount = eligible_subtotal * d.amount / dec!(100);
                (base_total - discount_amount).max(Decimal::ZERO)
            }
            DiscountType::FixedAmount => (base_total - d.amount).max(Decimal::ZERO),
        },
    };

    CartPricing {
        lines: priced_lines,
        base_total,
        total_savings: (base_total - discounted_total).max(Decimal::ZERO),
        discounted_total,
        discount_applied: active.is_some(),
    }
}

/// Subtotal of lines whose product is not excluded from the discount.
pub fn eligible_subtotal(lines: &[LineInput], excluded_products: &HashSet<Uuid>) -> Decimal {
    lines
        .iter()
        .filter(|l| !excluded_products.contains(&l.product_id))
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum()
}

/// Shipping option reduced to its pricing terms.
#[derive(Debug, Clone)]
pub struct ShippingTerms {
    pub delivery_speed: String,
    pub price_minor_units: i32,
}

/// Shipping charge for a session.
///
/// No option selected costs nothing (nothing to quote yet). Standard
/// delivery is free once the discounted cart total reaches the threshold;
/// other speeds never are. The minor-unit price converts to pounds with
/// round-half-up.
pub fn shipping_cost(
    option: Option<&ShippingTerms>,
    discounted_total: Decimal,
    free_threshold: Decimal,
) -> Decimal {
    match option {
        None => Decimal::ZERO,
        Some(o) => {
            if o.delivery_speed == STANDARD_DELIVERY_SPEED && discounted_total >= free_threshold {
                Decimal::ZERO
            } else {
                (Decimal::from(o.price_minor_units) / dec!(100))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            }
        }
    }
}

/// Grand total: cart total plus shipping, rounded up to the penny.
///
/// Note the asymmetry with [`shipping_cost`]: the minor-unit conversion
/// rounds half-up, the grand total always rounds toward the customer-safe
/// ceiling. Both behaviors are load-bearing for reconciliation against the
/// payment processor.
pub fn total_with_shipping(discounted_total: Decimal, shipping: Decimal) -> Decimal {
    (discounted_total + shipping).round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity)
}
