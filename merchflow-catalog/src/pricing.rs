use crate::discount::Discount;
use crate::product::{CustomizationType, Product};
use merchflow_core::{CoreError, CoreResult};
use merchflow_shared::money::{percent_of, round1, round2, round4};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryOption {
    Standard,
    Express,
}

/// Pricing constants. GST is charged on the discounted subtotal only;
/// intra-state orders split the rate evenly into CGST + SGST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub gst_rate_pct: Decimal,
    pub seller_home_state: String,
    pub free_delivery_threshold: Decimal,
    pub standard_delivery_charge: Decimal,
    pub express_delivery_charge: Decimal,
    pub logo_print_fee: Decimal,
    pub embroidery_fee: Decimal,
    pub engraving_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            gst_rate_pct: Decimal::from(18),
            seller_home_state: "Karnataka".to_string(),
            free_delivery_threshold: Decimal::from(10_000),
            standard_delivery_charge: Decimal::from(99),
            express_delivery_charge: Decimal::from(299),
            logo_print_fee: Decimal::from(10),
            embroidery_fee: Decimal::from(25),
            engraving_fee: Decimal::from(40),
        }
    }
}

impl PricingConfig {
    /// Per-unit customization fee by type.
    pub fn customization_fee(&self, customization: CustomizationType) -> Decimal {
        match customization {
            CustomizationType::None => Decimal::ZERO,
            CustomizationType::LogoPrint => self.logo_print_fee,
            CustomizationType::Embroidery => self.embroidery_fee,
            CustomizationType::Engraving => self.engraving_fee,
        }
    }
}

/// Fully itemized price of one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuote {
    pub quantity: u32,
    pub unit_price: Decimal,
    pub customization_fee: Decimal,
    pub discount_pct: Decimal,
    /// (unit price + customization fee) x quantity
    pub gross_subtotal: Decimal,
    /// Discount base is tier price x quantity; the customization fee is
    /// never discounted.
    pub discount_amount: Decimal,
    pub discounted_subtotal: Decimal,
    pub base_tier_unit_price: Decimal,
    /// Set when no tier matched and the base price was used. Indicates a
    /// tier-set invariant broken after catalog validation.
    pub base_price_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

impl TaxBreakdown {
    pub fn total(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Savings {
    pub amount: Decimal,
    pub percent: Decimal,
}

/// The complete order-level price snapshot pinned at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub original_subtotal: Decimal,
    pub discounted_subtotal: Decimal,
    pub tax: TaxBreakdown,
    pub delivery_charge: Decimal,
    pub total: Decimal,
    pub savings: Savings,
}

/// Pure pricing computation over product, tier, and discount data.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Resolve the unit price for a quantity by scanning tiers from the
    /// highest tier number downward. Falls back to the product's base
    /// price when no tier matches; a validated tier set cannot miss, so
    /// the fallback is logged as a data-invariant warning.
    pub fn resolve_unit_price(&self, product: &Product, quantity: u32) -> (Decimal, bool) {
        let matched = product
            .tiers
            .iter()
            .rev()
            .find(|tier| tier.contains(quantity));
        match matched {
            Some(tier) => (tier.unit_price, false),
            None => {
                tracing::warn!(
                    product_id = %product.id,
                    quantity,
                    "no pricing tier matched; falling back to base price"
                );
                (product.base_price, true)
            }
        }
    }

    /// Price one line: tier price, per-unit fee for the requested
    /// customization, and the active discount. Rounds half-up to 2
    /// decimals at each monetary step so re-pricing a stored line
    /// reproduces it exactly.
    pub fn quote_item(
        &self,
        product: &Product,
        quantity: u32,
        customization: CustomizationType,
        discount: Option<&Discount>,
    ) -> CoreResult<ItemQuote> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
            return Err(CoreError::Validation(format!(
                "quantity {quantity} outside {MIN_QUANTITY}..={MAX_QUANTITY}"
            )));
        }
        let (unit_price, base_price_fallback) = self.resolve_unit_price(product, quantity);
        let customization_fee = self.config.customization_fee(customization);
        let quantity_dec = Decimal::from(quantity);

        let gross_subtotal = round2((unit_price + customization_fee) * quantity_dec);
        let discount_pct = discount.map(|d| d.percentage).unwrap_or(Decimal::ZERO);
        let tier_base = round2(unit_price * quantity_dec);
        let discount_amount = percent_of(tier_base, discount_pct);
        let discounted_subtotal = round2(gross_subtotal - discount_amount);

        Ok(ItemQuote {
            quantity,
            unit_price,
            customization_fee,
            discount_pct,
            gross_subtotal,
            discount_amount,
            discounted_subtotal,
            base_tier_unit_price: product.base_tier_price(),
            base_price_fallback,
        })
    }

    /// Sum item quotes into the order-level breakdown: GST on the
    /// discounted subtotal, the delivery rule, and the savings figure.
    pub fn price_order(
        &self,
        quotes: &[ItemQuote],
        delivery_state: &str,
        delivery_option: DeliveryOption,
    ) -> PriceBreakdown {
        let original_subtotal = round2(quotes.iter().map(|q| q.gross_subtotal).sum());
        let discounted_subtotal = round2(quotes.iter().map(|q| q.discounted_subtotal).sum());

        let tax = self.compute_tax(discounted_subtotal, delivery_state);
        let delivery_charge = self.delivery_charge(discounted_subtotal, delivery_option);
        let total = round2(discounted_subtotal + tax.total() + delivery_charge);

        let base_total = round2(
            quotes
                .iter()
                .map(|q| q.base_tier_unit_price * Decimal::from(q.quantity))
                .sum(),
        );
        let savings = Self::savings(base_total, discounted_subtotal);

        PriceBreakdown {
            original_subtotal,
            discounted_subtotal,
            tax,
            delivery_charge,
            total,
            savings,
        }
    }

    fn compute_tax(&self, discounted_subtotal: Decimal, delivery_state: &str) -> TaxBreakdown {
        let half_rate = self.config.gst_rate_pct / Decimal::from(2);
        if delivery_state == self.config.seller_home_state {
            TaxBreakdown {
                cgst: percent_of(discounted_subtotal, half_rate),
                sgst: percent_of(discounted_subtotal, half_rate),
                igst: Decimal::ZERO,
            }
        } else {
            TaxBreakdown {
                cgst: Decimal::ZERO,
                sgst: Decimal::ZERO,
                igst: percent_of(discounted_subtotal, self.config.gst_rate_pct),
            }
        }
    }

    /// STANDARD is waived above the free-delivery threshold; EXPRESS is
    /// always charged flat.
    fn delivery_charge(&self, discounted_subtotal: Decimal, option: DeliveryOption) -> Decimal {
        match option {
            DeliveryOption::Standard => {
                if discounted_subtotal > self.config.free_delivery_threshold {
                    Decimal::ZERO
                } else {
                    self.config.standard_delivery_charge
                }
            }
            DeliveryOption::Express => self.config.express_delivery_charge,
        }
    }

    /// Savings versus paying the base-tier price for every unit.
    /// Percentage divides at 4 decimals before the final 1-decimal round.
    fn savings(base_total: Decimal, applied_subtotal: Decimal) -> Savings {
        let amount = round2(base_total - applied_subtotal);
        let percent = if base_total.is_zero() {
            Decimal::ZERO
        } else {
            round1(round4(amount / base_total * Decimal::from(100)))
        };
        Savings { amount, percent }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{PricingTier, ProductStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn bottle(customization: CustomizationType) -> Product {
        Product {
            id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            name: "Steel Bottle".to_string(),
            status: ProductStatus::Active,
            base_price: Decimal::from(120),
            customization,
            tiers: vec![
                PricingTier {
                    tier_number: 1,
                    min_quantity: 1,
                    max_quantity: Some(99),
                    unit_price: Decimal::from(100),
                    tier_discount_pct: Decimal::ZERO,
                },
                PricingTier {
                    tier_number: 2,
                    min_quantity: 100,
                    max_quantity: Some(499),
                    unit_price: Decimal::from(90),
                    tier_discount_pct: Decimal::ZERO,
                },
                PricingTier {
                    tier_number: 3,
                    min_quantity: 500,
                    max_quantity: None,
                    unit_price: Decimal::from(80),
                    tier_discount_pct: Decimal::ZERO,
                },
            ],
        }
    }

    fn approved_discount(product_id: Uuid, pct: i64) -> Discount {
        Discount {
            id: Uuid::new_v4(),
            product_id,
            partner_id: None,
            percentage: Decimal::from(pct),
            status: crate::discount::DiscountStatus::Approved,
            starts_at: None,
            ends_at: None,
            approved_by: Some("admin".to_string()),
            approved_at: Some(Utc::now()),
            disabled_by: None,
            disabled_at: None,
            expired_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tier_resolution_quantity_250() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);

        let quote = engine.quote_item(&product, 250, CustomizationType::None, None).unwrap();
        assert_eq!(quote.unit_price, Decimal::from(90));
        assert_eq!(quote.gross_subtotal, Decimal::from(22_500));
        assert!(!quote.base_price_fallback);
    }

    #[test]
    fn test_every_quantity_resolves_exactly_one_tier() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);

        for quantity in [1, 99, 100, 499, 500, 10_000] {
            let matching = product
                .tiers
                .iter()
                .filter(|t| t.contains(quantity))
                .count();
            assert_eq!(matching, 1, "quantity {quantity}");
            let quote = engine.quote_item(&product, quantity, CustomizationType::None, None).unwrap();
            assert!(!quote.base_price_fallback);
        }
    }

    #[test]
    fn test_base_price_fallback_when_tiers_broken() {
        let engine = PricingEngine::default();
        let mut product = bottle(CustomizationType::None);
        // Simulate a post-creation edit that broke coverage.
        product.tiers.retain(|t| t.tier_number != 2);

        let quote = engine.quote_item(&product, 250, CustomizationType::None, None).unwrap();
        assert!(quote.base_price_fallback);
        assert_eq!(quote.unit_price, Decimal::from(120));
    }

    #[test]
    fn test_quantity_bounds() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);
        assert!(engine.quote_item(&product, 0, CustomizationType::None, None).is_err());
        assert!(engine.quote_item(&product, 10_001, CustomizationType::None, None).is_err());
    }

    #[test]
    fn test_customization_fee_not_discounted() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::LogoPrint);
        let discount = approved_discount(product.id, 10);

        // 50 units: tier price 100, fee 10/unit.
        let quote = engine
            .quote_item(&product, 50, CustomizationType::LogoPrint, Some(&discount))
            .unwrap();
        assert_eq!(quote.gross_subtotal, Decimal::from(5_500));
        // Discount base excludes the fee: 10% of 5000, not of 5500.
        assert_eq!(quote.discount_amount, Decimal::from(500));
        assert_eq!(quote.discounted_subtotal, Decimal::from(5_000));
    }

    #[test]
    fn test_intra_state_tax_split_and_standard_delivery() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);
        let discount = approved_discount(product.id, 20);

        // 50 units at 100 = 5000 gross, 20% discount -> 4000.
        let quote = engine.quote_item(&product, 50, CustomizationType::None, Some(&discount)).unwrap();
        assert_eq!(quote.discounted_subtotal, Decimal::from(4_000));

        let breakdown = engine.price_order(&[quote], "Karnataka", DeliveryOption::Standard);
        assert_eq!(breakdown.tax.cgst, Decimal::from(360));
        assert_eq!(breakdown.tax.sgst, Decimal::from(360));
        assert_eq!(breakdown.tax.igst, Decimal::ZERO);
        // Below the 10,000 threshold, standard delivery is charged.
        assert_eq!(breakdown.delivery_charge, Decimal::from(99));
        assert_eq!(
            breakdown.total,
            Decimal::from(4_000) + Decimal::from(720) + Decimal::from(99)
        );
    }

    #[test]
    fn test_inter_state_igst() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);

        let quote = engine.quote_item(&product, 50, CustomizationType::None, None).unwrap();
        let breakdown = engine.price_order(&[quote], "Maharashtra", DeliveryOption::Standard);
        assert_eq!(breakdown.tax.cgst, Decimal::ZERO);
        assert_eq!(breakdown.tax.igst, Decimal::from(900)); // 18% of 5000
    }

    #[test]
    fn test_free_delivery_above_threshold_standard_only() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);

        let quote = engine.quote_item(&product, 250, CustomizationType::None, None).unwrap(); // 22,500
        let standard = engine.price_order(
            std::slice::from_ref(&quote),
            "Karnataka",
            DeliveryOption::Standard,
        );
        assert_eq!(standard.delivery_charge, Decimal::ZERO);

        // Express is flat regardless of subtotal.
        let express = engine.price_order(&[quote], "Karnataka", DeliveryOption::Express);
        assert_eq!(express.delivery_charge, Decimal::from(299));
    }

    #[test]
    fn test_savings_against_base_tier() {
        let engine = PricingEngine::default();
        let product = bottle(CustomizationType::None);

        // 500 units at tier price 80 vs base tier 100.
        let quote = engine.quote_item(&product, 500, CustomizationType::None, None).unwrap();
        let breakdown = engine.price_order(&[quote], "Karnataka", DeliveryOption::Standard);
        assert_eq!(breakdown.savings.amount, Decimal::from(10_000));
        assert_eq!(breakdown.savings.percent, Decimal::from(20));
    }

    #[test]
    fn test_rounding_idempotence() {
        let engine = PricingEngine::default();
        let mut product = bottle(CustomizationType::None);
        product.tiers[0].unit_price = Decimal::new(9999, 2); // 99.99
        let discount = approved_discount(product.id, 7);

        let quote = engine.quote_item(&product, 33, CustomizationType::None, Some(&discount)).unwrap();
        let first = engine.price_order(
            std::slice::from_ref(&quote),
            "Karnataka",
            DeliveryOption::Standard,
        );
        let second = engine.price_order(&[quote], "Karnataka", DeliveryOption::Standard);
        assert_eq!(first.total, second.total);
        assert_eq!(first.total, merchflow_shared::round2(first.total));
    }
}
