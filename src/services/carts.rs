use crate::{
    entities::{
        box_customization, box_customization_allergen, box_flavor_selection, cart, cart_item,
        product, BoxCustomization, BoxCustomizationAllergen, BoxFlavorSelection, Cart, CartItem,
        Discount, Product, SelectionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    identity::CartOwner,
    owner_locks::OwnerLocks,
    services::{
        discounts::DiscountService,
        pricing::{self, DiscountTerms, LineInput},
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service.
///
/// Owns the get-or-create race protection, item mutation with box
/// customization validation, and the always-re-priced cart reads that
/// every cart endpoint returns.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    discounts: Arc<DiscountService>,
    locks: OwnerLocks,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        discounts: Arc<DiscountService>,
        locks: OwnerLocks,
    ) -> Self {
        Self {
            db,
            event_sender,
            discounts,
            locks,
        }
    }

    /// Find the owner's active cart, creating one when none exists.
    ///
    /// The check-then-create runs while holding the owner-key lock and
    /// inside a single transaction, so two concurrent first-touch requests
    /// for the same owner cannot both insert: at most one `active = true`
    /// cart exists per owner at any committed point in time. Session
    /// lookups additionally require `user_id IS NULL` so a session cart
    /// never aliases a user's cart. Deactivated carts are never revived.
    #[instrument(skip(self))]
    pub async fn get_or_create_active_cart(
        &self,
        owner: &CartOwner,
    ) -> Result<(cart::Model, bool), ServiceError> {
        let _guard = self.locks.acquire(&owner.lock_key()).await;
        let txn = self.db.begin().await?;
        let (cart, was_created) = self.get_or_create_active_cart_in(&txn, owner).await?;
        txn.commit().await?;

        if was_created {
            self.event_sender
                .send_or_log(Event::CartCreated(cart.id))
                .await;
            info!(cart_id = %cart.id, "created cart");
        }
        Ok((cart, was_created))
    }

    /// Transaction-scoped get-or-create. The caller must already hold the
    /// owner-key lock (see [`OwnerLocks`]) for the race protection to mean
    /// anything; the checkout service uses this to keep cart resolution
    /// and session creation in one transaction.
    pub async fn get_or_create_active_cart_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
    ) -> Result<(cart::Model, bool), ServiceError> {
        let existing = self.find_active_cart(conn, owner).await?;
        if let Some(found) = existing {
            return Ok((found, false));
        }

        let now = Utc::now();
        let (user_id, session_id) = match owner {
            CartOwner::User(id) => (Some(*id), None),
            CartOwner::Session(token) => (None, Some(token.clone())),
        };

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_id: Set(session_id),
            discount_id: Set(None),
            gift_message: Set(None),
            shipping_date: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let cart = cart.insert(conn).await?;
        Ok((cart, true))
    }

    /// Lock registry shared with collaborating services.
    pub fn locks(&self) -> &OwnerLocks {
        &self.locks
    }

    async fn find_active_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
    ) -> Result<Option<cart::Model>, ServiceError> {
        let query = match owner {
            CartOwner::User(id) => Cart::find().filter(cart::Column::UserId.eq(*id)),
            CartOwner::Session(token) => Cart::find()
                .filter(cart::Column::SessionId.eq(token.clone()))
                .filter(cart::Column::UserId.is_null()),
        };
        Ok(query
            .filter(cart::Column::Active.eq(true))
            .order_by_desc(cart::Column::CreatedAt)
            .one(conn)
            .await?)
    }

    /// Get-or-create the owner's cart and return it fully priced.
    pub async fn current_priced_cart(&self, owner: &CartOwner) -> Result<PricedCart, ServiceError> {
        let (cart, _) = self.get_or_create_active_cart(owner).await?;
        self.priced_cart(&*self.db, &cart).await
    }

    /// Add an item (with optional box customization) to the owner's cart.
    ///
    /// Item, customization, flavor selections and allergen links all land
    /// in one transaction; validation happens before any row is written.
    #[instrument(skip(self, input))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        input: AddItemInput,
    ) -> Result<PricedCart, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let (cart, _) = self.get_or_create_active_cart(owner).await?;
        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product)
            .one(&txn)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", input.product)))?;

        if let Some(customization) = &input.box_customization {
            validate_box_customization(customization, &product)?;
        }

        let now = Utc::now();
        let item = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let item = item.insert(&txn).await?;

        if let Some(customization) = &input.box_customization {
            let row = box_customization::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_item_id: Set(item.id),
                selection_type: Set(customization.selection_type),
            };
            let row = row.insert(&txn).await?;

            for selection in &customization.flavor_selections {
                box_flavor_selection::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    box_customization_id: Set(row.id),
                    flavour_id: Set(selection.flavour),
                    quantity: Set(selection.quantity),
                }
                .insert(&txn)
                .await?;
            }

            for allergen_id in &customization.allergens {
                box_customization_allergen::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    box_customization_id: Set(row.id),
                    allergen_id: Set(*allergen_id),
                }
                .insert(&txn)
                .await?;
            }
        }

        touch_cart(&txn, &cart).await?;
        let priced = self.priced_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: product.id,
            })
            .await;
        info!(cart_id = %cart.id, product_id = %product.id, quantity = input.quantity, "added cart item");
        Ok(priced)
    }

    /// Change an item's quantity. The item must belong to the owner's cart.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        owner: &CartOwner,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<PricedCart, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let (cart, _) = self.get_or_create_active_cart(owner).await?;
        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .filter(|i| i.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        touch_cart(&txn, &cart).await?;
        let priced = self.priced_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;
        Ok(priced)
    }

    /// Remove an item from the owner's cart. Customization rows cascade.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        item_id: Uuid,
    ) -> Result<PricedCart, ServiceError> {
        let (cart, _) = self.get_or_create_active_cart(owner).await?;
        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .filter(|i| i.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        CartItem::delete_by_id(item.id).exec(&txn).await?;

        touch_cart(&txn, &cart).await?;
        let priced = self.priced_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;
        Ok(priced)
    }

    /// Partial update of cart details: gift message, shipping date,
    /// discount code. Absent fields stay untouched; removing the discount
    /// takes the explicit flag (or an empty code), never mere absence.
    #[instrument(skip(self, input))]
    pub async fn update_details(
        &self,
        owner: &CartOwner,
        input: UpdateCartInput,
    ) -> Result<(PricedCart, Option<String>), ServiceError> {
        let (cart, _) = self.get_or_create_active_cart(owner).await?;
        let txn = self.db.begin().await?;

        let mut message = None;
        let mut active: cart::ActiveModel = cart.clone().into();

        if let Some(gift_message) = input.gift_message {
            active.gift_message = Set(Some(gift_message));
        }

        if let Some(shipping_date) = input.shipping_date {
            if shipping_date < Utc::now().date_naive() {
                return Err(ServiceError::ValidationError(
                    "Shipping date cannot be in the past".to_string(),
                ));
            }
            active.shipping_date = Set(Some(shipping_date));
        }

        let remove_discount = input.remove_discount.unwrap_or(false)
            || matches!(input.discount_code.as_deref(), Some(code) if code.trim().is_empty());

        if remove_discount {
            if cart.discount_id.is_some() {
                active.discount_id = Set(None);
                self.event_sender
                    .send_or_log(Event::DiscountRemoved { cart_id: cart.id })
                    .await;
            }
        } else if let Some(code) = input
            .discount_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
        {
            let lines = self.load_lines(&txn, cart.id).await?;
            let validation = self
                .discounts
                .validate_for_cart_on(&txn, code, &lines)
                .await?;
            // Applying replaces whatever discount was there; no stacking
            active.discount_id = Set(Some(validation.discount.id));
            message = Some(validation.message.clone());
            self.event_sender
                .send_or_log(Event::DiscountApplied {
                    cart_id: cart.id,
                    discount_id: validation.discount.id,
                })
                .await;
        }

        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        let priced = self.priced_cart(&txn, &updated).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;
        Ok((priced, message))
    }

    /// Load a cart's lines as pricing inputs.
    pub async fn load_lines<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<Vec<LineInput>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (item, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart item {} references missing product",
                    item.id
                ))
            })?;
            lines.push(LineInput {
                item_id: item.id,
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.base_price,
            });
        }
        Ok(lines)
    }

    /// Assemble the fully priced view of a cart.
    pub async fn priced_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: &cart::Model,
    ) -> Result<PricedCart, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let discount = match cart.discount_id {
            Some(id) => Discount::find_by_id(id).one(conn).await?,
            None => None,
        };

        let now = Utc::now();
        let (terms, excluded) = match &discount {
            Some(d) => {
                let excluded = self.discounts.exclusions_for(conn, d.id).await?;
                (
                    Some(DiscountTerms {
                        discount_type: d.discount_type,
                        amount: d.amount,
                        min_order_value: d.min_order_value,
                        excluded_products: excluded.clone(),
                        valid: d.is_valid(now),
                    }),
                    excluded,
                )
            }
            None => (None, HashSet::new()),
        };

        let mut lines = Vec::with_capacity(rows.len());
        for (item, product) in &rows {
            let product = product.as_ref().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart item {} references missing product",
                    item.id
                ))
            })?;
            lines.push(LineInput {
                item_id: item.id,
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.base_price,
            });
        }
        let pricing = pricing::price_cart(&lines, terms.as_ref());

        let mut items = Vec::with_capacity(rows.len());
        for (item, product) in &rows {
            let Some(product) = product.as_ref() else {
                continue;
            };
            let Some(line) = pricing.lines.iter().find(|l| l.item_id == item.id) else {
                continue;
            };

            let customization = self.load_customization(conn, item.id).await?;

            items.push(PricedCartItem {
                id: item.id,
                quantity: item.quantity,
                product: ProductSummary {
                    id: product.id,
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    base_price: product.base_price,
                    units_per_box: product.units_per_box,
                },
                base_price: line.base_price,
                discounted_price: line.discounted_price,
                savings: line.savings,
                box_customization: customization,
            });
        }

        // Flag mirrors the original: the minimum is checked against the
        // base total here, while apply-time validation uses the eligible
        // subtotal.
        let is_discount_valid = discount
            .as_ref()
            .map(|d| pricing.base_total >= d.min_order_value)
            .unwrap_or(false);

        let discount_summary = discount.map(|d| DiscountSummary {
            id: d.id,
            code: d.code.clone(),
            discount_type: d.discount_type,
            amount: d.amount,
            min_order_value: d.min_order_value,
            status: d.status(now),
            excluded_products: excluded.into_iter().collect(),
        });

        Ok(PricedCart {
            id: cart.id,
            items,
            base_total: pricing.base_total,
            discounted_total: pricing.discounted_total,
            total_savings: pricing.total_savings,
            is_discount_valid,
            discount: discount_summary,
            gift_message: cart.gift_message.clone(),
            shipping_date: cart.shipping_date,
            active: cart.active,
        })
    }

    async fn load_customization<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_item_id: Uuid,
    ) -> Result<Option<BoxCustomizationView>, ServiceError> {
        let customization = BoxCustomization::find()
            .filter(box_customization::Column::CartItemId.eq(cart_item_id))
            .one(conn)
            .await?;

        let Some(customization) = customization else {
            return Ok(None);
        };

        let selections = BoxFlavorSelection::find()
            .filter(box_flavor_selection::Column::BoxCustomizationId.eq(customization.id))
            .all(conn)
            .await?;
        let allergens = BoxCustomizationAllergen::find()
            .filter(box_customization_allergen::Column::BoxCustomizationId.eq(customization.id))
            .all(conn)
            .await?;

        Ok(Some(BoxCustomizationView {
            selection_type: customization.selection_type,
            flavor_selections: selections
                .into_iter()
                .map(|s| FlavorSelectionView {
                    flavour: s.flavour_id,
                    quantity: s.quantity,
                })
                .collect(),
            allergens: allergens.into_iter().map(|a| a.allergen_id).collect(),
        }))
    }
}

/// Box customization rules, checked before anything is written:
/// pick-and-mix selections must fill the box exactly, random boxes carry
/// no selections at all.
fn validate_box_customization(
    customization: &BoxCustomizationInput,
    product: &product::Model,
) -> Result<(), ServiceError> {
    match customization.selection_type {
        SelectionType::PickAndMix => {
            let total: i32 = customization
                .flavor_selections
                .iter()
                .map(|s| s.quantity)
                .sum();
            if total != product.units_per_box {
                return Err(ServiceError::ValidationError(format!(
                    "Flavor selections must total {} chocolates for this box, got {}",
                    product.units_per_box, total
                )));
            }
            if customization.flavor_selections.iter().any(|s| s.quantity < 1) {
                return Err(ServiceError::ValidationError(
                    "Flavor selection quantities must be at least 1".to_string(),
                ));
            }
        }
        SelectionType::Random => {
            if !customization.flavor_selections.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Random boxes cannot include flavor selections".to_string(),
                ));
            }
        }
    }
    Ok(())
}

async fn touch_cart<C: ConnectionTrait>(
    conn: &C,
    cart: &cart::Model,
) -> Result<(), ServiceError> {
    let mut active: cart::ActiveModel = cart.clone().into();
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(())
}

// Inputs

#[derive(Debug, Clone, Deserialize)]
pub struct FlavorSelectionInput {
    pub flavour: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxCustomizationInput {
    pub selection_type: SelectionType,
    #[serde(default)]
    pub allergens: Vec<Uuid>,
    #[serde(default)]
    pub flavor_selections: Vec<FlavorSelectionInput>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product: Uuid,
    pub quantity: i32,
    pub box_customization: Option<BoxCustomizationInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCartInput {
    pub gift_message: Option<String>,
    pub shipping_date: Option<NaiveDate>,
    pub discount_code: Option<String>,
    pub remove_discount: Option<bool>,
}

// Priced views

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub units_per_box: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlavorSelectionView {
    pub flavour: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxCustomizationView {
    pub selection_type: SelectionType,
    pub flavor_selections: Vec<FlavorSelectionView>,
    pub allergens: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedCartItem {
    pub id: Uuid,
    pub product: ProductSummary,
    pub quantity: i32,
    pub base_price: Decimal,
    pub discounted_price: Decimal,
    pub savings: Decimal,
    pub box_customization: Option<BoxCustomizationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountSummary {
    pub id: Uuid,
    pub code: String,
    pub discount_type: crate::entities::DiscountType,
    pub amount: Decimal,
    pub min_order_value: Decimal,
    pub status: crate::entities::DiscountStatus,
    pub excluded_products: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub id: Uuid,
    pub items: Vec<PricedCartItem>,
    pub base_total: Decimal,
    pub discounted_total: Decimal,
    pub total_savings: Decimal,
    pub is_discount_valid: bool,
    pub discount: Option<DiscountSummary>,
    pub gift_message: Option<String>,
    pub shipping_date: Option<NaiveDate>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_product(units_per_box: i32) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            name: "Signature Box".into(),
            slug: "signature-box".into(),
            description: "A box".into(),
            base_price: dec!(19.99),
            stripe_price_id: "price_123".into(),
            weight_grams: 250,
            units_per_box,
            active: true,
            sold_out: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pick_and_mix_must_fill_the_box() {
        let product = test_product(12);
        let customization = BoxCustomizationInput {
            selection_type: SelectionType::PickAndMix,
            allergens: vec![],
            flavor_selections: vec![
                FlavorSelectionInput {
                    flavour: Uuid::new_v4(),
                    quantity: 6,
                },
                FlavorSelectionInput {
                    flavour: Uuid::new_v4(),
                    quantity: 5,
                },
            ],
        };
        let err = validate_box_customization(&customization, &product).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("12"), "expected total in: {}", message);
        assert!(message.contains("11"), "actual total in: {}", message);
    }

    #[test]
    fn pick_and_mix_exact_fill_passes() {
        let product = test_product(9);
        let customization = BoxCustomizationInput {
            selection_type: SelectionType::PickAndMix,
            allergens: vec![Uuid::new_v4()],
            flavor_selections: vec![FlavorSelectionInput {
                flavour: Uuid::new_v4(),
                quantity: 9,
            }],
        };
        assert!(validate_box_customization(&customization, &product).is_ok());
    }

    #[test]
    fn random_box_rejects_selections() {
        let product = test_product(12);
        let customization = BoxCustomizationInput {
            selection_type: SelectionType::Random,
            allergens: vec![],
            flavor_selections: vec![FlavorSelectionInput {
                flavour: Uuid::new_v4(),
                quantity: 12,
            }],
        };
        assert!(validate_box_customization(&customization, &product).is_err());
    }

    #[test]
    fn random_box_without_selections_passes() {
        let product = test_product(12);
        let customization = BoxCustomizationInput {
            selection_type: SelectionType::Random,
            allergens: vec![Uuid::new_v4()],
            flavor_selections: vec![],
        };
        assert!(validate_box_customization(&customization, &product).is_ok());
    }
}
