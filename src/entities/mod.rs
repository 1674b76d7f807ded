/// Database entities
pub mod address;
pub mod allergen;
pub mod box_customization;
pub mod box_customization_allergen;
pub mod box_flavor_selection;
pub mod cart;
pub mod cart_item;
pub mod checkout_session;
pub mod discount;
pub mod discount_exclusion;
pub mod email_record;
pub mod flavour;
pub mod lead;
pub mod order;
pub mod order_status_history;
pub mod product;
pub mod shipping_company;
pub mod shipping_option;

// Re-export entities
pub use address::{AddressType, Entity as Address, Model as AddressModel};
pub use allergen::{Entity as Allergen, Model as AllergenModel};
pub use box_customization::{
    Entity as BoxCustomization, Model as BoxCustomizationModel, SelectionType,
};
pub use box_customization_allergen::{
    Entity as BoxCustomizationAllergen, Model as BoxCustomizationAllergenModel,
};
pub use box_flavor_selection::{Entity as BoxFlavorSelection, Model as BoxFlavorSelectionModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use checkout_session::{Entity as CheckoutSession, Model as CheckoutSessionModel, PaymentStatus};
pub use discount::{Entity as Discount, DiscountStatus, DiscountType, Model as DiscountModel};
pub use discount_exclusion::{Entity as DiscountExclusion, Model as DiscountExclusionModel};
pub use email_record::{
    EmailStatus, EmailTargetKind, EmailType, Entity as EmailRecord, Model as EmailRecordModel,
};
pub use flavour::{Entity as Flavour, Model as FlavourModel};
pub use lead::{Entity as Lead, LeadType, Model as LeadModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_status_history::{Entity as OrderStatusHistory, Model as OrderStatusHistoryModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use shipping_company::{Entity as ShippingCompany, Model as ShippingCompanyModel};
pub use shipping_option::{Entity as ShippingOption, Model as ShippingOptionModel};
