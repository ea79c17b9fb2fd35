pub mod discount;
pub mod pricing;
pub mod product;

pub use discount::{Discount, DiscountLimit, DiscountRegistry, DiscountStatus};
pub use pricing::{
    DeliveryOption, ItemQuote, PriceBreakdown, PricingConfig, PricingEngine, Savings, TaxBreakdown,
};
pub use product::{CustomizationType, PricingTier, Product, ProductCatalog, ProductStatus};
