use crate::discount::{Discount, DiscountRegistry};
use merchflow_core::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
    Deleted,
}

/// Customization applied per unit. The fee schedule lives in
/// `PricingConfig`; `None` always costs zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomizationType {
    None,
    LogoPrint,
    Embroidery,
    Engraving,
}

/// One quantity band of a product's tiered price list. `max_quantity`
/// of `None` means unbounded; only the last tier may be unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub tier_number: u32,
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub unit_price: Decimal,
    pub tier_discount_pct: Decimal,
}

impl PricingTier {
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity
            && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub name: String,
    pub status: ProductStatus,
    pub base_price: Decimal,
    pub customization: CustomizationType,
    /// Owned aggregate: tiers are loaded and validated with the product,
    /// ordered by tier number.
    pub tiers: Vec<PricingTier>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Unit price of the first (base) tier, used for savings display.
    /// Falls back to the base price when the tier set is empty.
    pub fn base_tier_price(&self) -> Decimal {
        self.tiers
            .first()
            .map(|tier| tier.unit_price)
            .unwrap_or(self.base_price)
    }
}

/// Enforces the tier-set invariants: ordered by tier number, first tier
/// starts at quantity 1, tiers contiguous, only the last tier unbounded,
/// unit price non-increasing, and at least 3 tiers for customizable
/// products. Violations are rejected at catalog time so every quantity
/// >= 1 resolves to exactly one tier.
pub fn validate_tiers(product: &Product) -> CoreResult<()> {
    let tiers = &product.tiers;
    if tiers.is_empty() {
        return Err(CoreError::Validation(format!(
            "product {} has no pricing tiers",
            product.id
        )));
    }
    if product.customization != CustomizationType::None && tiers.len() < 3 {
        return Err(CoreError::Validation(format!(
            "customizable product {} requires at least 3 tiers, has {}",
            product.id,
            tiers.len()
        )));
    }
    if tiers[0].min_quantity != 1 {
        return Err(CoreError::Validation(
            "first tier must start at quantity 1".to_string(),
        ));
    }
    for window in tiers.windows(2) {
        let (current, next) = (&window[0], &window[1]);
        if next.tier_number <= current.tier_number {
            return Err(CoreError::Validation(
                "tiers must be ordered by ascending tier number".to_string(),
            ));
        }
        let max = current.max_quantity.ok_or_else(|| {
            CoreError::Validation("only the last tier may be unbounded".to_string())
        })?;
        if next.min_quantity != max + 1 {
            return Err(CoreError::Validation(format!(
                "tier {} and {} are not contiguous",
                current.tier_number, next.tier_number
            )));
        }
        if next.unit_price > current.unit_price {
            return Err(CoreError::Validation(format!(
                "unit price must not increase from tier {} to {}",
                current.tier_number, next.tier_number
            )));
        }
    }
    Ok(())
}

/// In-memory catalog: products plus their discount registry, loaded as
/// one unit. Catalog CRUD itself is out of scope; this is the read
/// surface the engine consumes.
pub struct ProductCatalog {
    products: HashMap<Uuid, Product>,
    pub discounts: DiscountRegistry,
}

impl ProductCatalog {
    pub fn new(discounts: DiscountRegistry) -> Self {
        Self {
            products: HashMap::new(),
            discounts,
        }
    }

    /// Add a product, enforcing the tier invariants up front.
    pub fn add_product(&mut self, product: Product) -> CoreResult<()> {
        validate_tiers(&product)?;
        self.products.insert(product.id, product);
        Ok(())
    }

    pub fn get_product(&self, id: Uuid) -> CoreResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("product {id}")))
    }

    pub fn active_discount(
        &self,
        product_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<&Discount> {
        self.discounts.active_discount(product_id, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(number: u32, min: u32, max: Option<u32>, price: i64) -> PricingTier {
        PricingTier {
            tier_number: number,
            min_quantity: min,
            max_quantity: max,
            unit_price: Decimal::from(price),
            tier_discount_pct: Decimal::ZERO,
        }
    }

    fn product_with_tiers(tiers: Vec<PricingTier>) -> Product {
        Product {
            id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            name: "Steel Bottle".to_string(),
            status: ProductStatus::Active,
            base_price: Decimal::from(120),
            customization: CustomizationType::LogoPrint,
            tiers,
        }
    }

    #[test]
    fn test_valid_tier_set() {
        let product = product_with_tiers(vec![
            tier(1, 1, Some(99), 100),
            tier(2, 100, Some(499), 90),
            tier(3, 500, None, 80),
        ]);
        assert!(validate_tiers(&product).is_ok());
    }

    #[test]
    fn test_tier_gap_rejected() {
        let product = product_with_tiers(vec![
            tier(1, 1, Some(99), 100),
            tier(2, 101, Some(499), 90),
            tier(3, 500, None, 80),
        ]);
        assert!(validate_tiers(&product).is_err());
    }

    #[test]
    fn test_increasing_price_rejected() {
        let product = product_with_tiers(vec![
            tier(1, 1, Some(99), 80),
            tier(2, 100, Some(499), 90),
            tier(3, 500, None, 100),
        ]);
        assert!(validate_tiers(&product).is_err());
    }

    #[test]
    fn test_customizable_needs_three_tiers() {
        let product = product_with_tiers(vec![tier(1, 1, Some(99), 100), tier(2, 100, None, 90)]);
        assert!(validate_tiers(&product).is_err());
    }

    #[test]
    fn test_unbounded_middle_tier_rejected() {
        let product = product_with_tiers(vec![
            tier(1, 1, None, 100),
            tier(2, 100, Some(499), 90),
            tier(3, 500, None, 80),
        ]);
        assert!(validate_tiers(&product).is_err());
    }

    #[test]
    fn test_first_tier_must_start_at_one() {
        let product = product_with_tiers(vec![
            tier(1, 2, Some(99), 100),
            tier(2, 100, Some(499), 90),
            tier(3, 500, None, 80),
        ]);
        assert!(validate_tiers(&product).is_err());
    }
}
