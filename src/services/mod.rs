/// Business logic services
pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod discounts;
pub mod leads;
pub mod mailer;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod webhooks;

// Re-export services for convenience
pub use addresses::AddressService;
pub use carts::{AddItemInput, CartService, PricedCart, UpdateCartInput};
pub use catalog::CatalogService;
pub use checkout::{CheckoutRequest, CheckoutService, CheckoutSummary};
pub use discounts::DiscountService;
pub use leads::LeadService;
pub use mailer::{LogMailer, Mailer, NotificationService};
pub use orders::OrderService;
pub use payments::{PaymentClient, StripePaymentClient};
pub use webhooks::{WebhookEvent, WebhookProcessor};
