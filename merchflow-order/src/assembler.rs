use crate::models::{Cart, DeliveryAddress, Order, OrderItem};
use chrono::{DateTime, Utc};
use merchflow_catalog::{DeliveryOption, ItemQuote, PricingEngine, ProductCatalog};
use merchflow_core::{CoreError, CoreResult, ServiceabilityResolver};
use uuid::Uuid;

/// Delivery details supplied at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub address_line: String,
    pub pin_code: String,
    pub delivery_option: DeliveryOption,
}

/// Converts a cart into an immutable priced Order at checkout, pinning
/// prices, tax, and delivery charge. All validation happens before
/// anything is mutated, so a failed checkout leaves the cart untouched
/// and creates no order.
pub struct OrderAssembler {
    pricing: PricingEngine,
}

impl OrderAssembler {
    pub fn new(pricing: PricingEngine) -> Self {
        Self { pricing }
    }

    pub async fn checkout(
        &self,
        cart: &mut Cart,
        catalog: &ProductCatalog,
        resolver: &dyn ServiceabilityResolver,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        if cart.items.is_empty() {
            return Err(CoreError::Validation("cart is empty".to_string()));
        }

        let pin_info = resolver
            .resolve(&request.pin_code)
            .await?
            .filter(|info| info.serviceable)
            .ok_or_else(|| {
                CoreError::BusinessRule(format!(
                    "delivery is not available for PIN code {}",
                    request.pin_code
                ))
            })?;
        if request.delivery_option == DeliveryOption::Express && !pin_info.express_available {
            return Err(CoreError::BusinessRule(format!(
                "express delivery is not available for PIN code {}",
                request.pin_code
            )));
        }

        let mut partner_id: Option<Uuid> = None;
        let mut priced: Vec<(ItemQuote, OrderItem)> = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = catalog.get_product(item.product_id)?;
            if !product.is_active() {
                return Err(CoreError::BusinessRule(format!(
                    "product '{}' is no longer available",
                    product.name
                )));
            }
            // Single-partner-per-order rule. The message stays generic:
            // partner identity is never surfaced to the client.
            match partner_id {
                None => partner_id = Some(product.partner_id),
                Some(existing) if existing != product.partner_id => {
                    return Err(CoreError::BusinessRule(
                        "these items cannot be processed together".to_string(),
                    ));
                }
                Some(_) => {}
            }

            let discount = catalog.active_discount(product.id, now);
            let quote =
                self.pricing
                    .quote_item(product, item.quantity, item.customization, discount)?;
            let order_item = OrderItem {
                id: Uuid::new_v4(),
                product_id: product.id,
                product_name: product.name.clone(),
                customization: item.customization,
                quantity: quote.quantity,
                unit_price: quote.unit_price,
                customization_fee: quote.customization_fee,
                discount_pct: quote.discount_pct,
                subtotal: quote.gross_subtotal,
                discounted_subtotal: quote.discounted_subtotal,
            };
            priced.push((quote, order_item));
        }

        let (quotes, items): (Vec<ItemQuote>, Vec<OrderItem>) = priced.into_iter().unzip();
        let breakdown = self
            .pricing
            .price_order(&quotes, &pin_info.state, request.delivery_option);

        // Guaranteed by the non-empty check, but stays an error, not a panic.
        let partner_id =
            partner_id.ok_or_else(|| CoreError::Validation("cart is empty".to_string()))?;
        let order = Order::new(
            cart.buyer_id,
            partner_id,
            items,
            breakdown,
            DeliveryAddress {
                line: request.address_line,
                city: pin_info.city,
                state: pin_info.state,
                pin_code: request.pin_code,
            },
            request.delivery_option,
            now,
        );

        // Clearing the cart is the only mutation, and only on success.
        cart.items.clear();
        tracing::info!(order_id = %order.id, total = %order.pricing.total, "order assembled");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartItem;
    use merchflow_catalog::{
        CustomizationType, DiscountRegistry, PricingTier, Product, ProductStatus,
    };
    use merchflow_core::{MockServiceabilityResolver, PinCodeInfo};
    use rust_decimal::Decimal;

    fn catalog_with(products: Vec<Product>) -> ProductCatalog {
        let mut catalog = ProductCatalog::new(DiscountRegistry::default());
        for product in products {
            catalog.add_product(product).unwrap();
        }
        catalog
    }

    fn mug(partner_id: Uuid) -> Product {
        Product {
            id: Uuid::new_v4(),
            partner_id,
            name: "Ceramic Mug".to_string(),
            status: ProductStatus::Active,
            base_price: Decimal::from(150),
            customization: CustomizationType::LogoPrint,
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

    fn resolver() -> MockServiceabilityResolver {
        MockServiceabilityResolver::default()
            .with_pin(
                "560001",
                PinCodeInfo {
                    city: "Bengaluru".to_string(),
                    state: "Karnataka".to_string(),
                    serviceable: true,
                    express_available: true,
                },
            )
            .with_pin(
                "790001",
                PinCodeInfo {
                    city: "Itanagar".to_string(),
                    state: "Arunachal Pradesh".to_string(),
                    serviceable: true,
                    express_available: false,
                },
            )
    }

    fn request(pin: &str, option: DeliveryOption) -> CheckoutRequest {
        CheckoutRequest {
            address_line: "12 MG Road".to_string(),
            pin_code: pin.to_string(),
            delivery_option: option,
        }
    }

    #[tokio::test]
    async fn test_checkout_pins_prices_and_clears_cart() {
        let partner_id = Uuid::new_v4();
        let product = mug(partner_id);
        let product_id = product.id;
        let catalog = catalog_with(vec![product]);
        let assembler = OrderAssembler::new(PricingEngine::default());
        let resolver = resolver();

        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id,
            customization: CustomizationType::None,
            quantity: 250,
        });

        let now = Utc::now();
        let order = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("560001", DeliveryOption::Standard),
                now,
            )
            .await
            .unwrap();

        assert!(cart.items.is_empty());
        assert_eq!(order.partner_id, partner_id);
        assert_eq!(order.pricing.discounted_subtotal, Decimal::from(22_500));
        // Above the free-delivery threshold.
        assert_eq!(order.pricing.delivery_charge, Decimal::ZERO);
        assert_eq!(
            order.payment_deadline,
            now + chrono::Duration::minutes(crate::models::PAYMENT_TIMEOUT_MINUTES)
        );
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let catalog = catalog_with(vec![]);
        let assembler = OrderAssembler::new(PricingEngine::default());
        let resolver = resolver();
        let mut cart = Cart::new(Uuid::new_v4());

        let result = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("560001", DeliveryOption::Standard),
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_multi_partner_cart_rejected_generically() {
        let product_a = mug(Uuid::new_v4());
        let product_b = mug(Uuid::new_v4());
        let (id_a, id_b) = (product_a.id, product_b.id);
        let catalog = catalog_with(vec![product_a, product_b]);
        let assembler = OrderAssembler::new(PricingEngine::default());
        let resolver = resolver();

        let mut cart = Cart::new(Uuid::new_v4());
        for product_id in [id_a, id_b] {
            cart.add_item(CartItem {
                product_id,
                customization: CustomizationType::None,
                quantity: 10,
            });
        }

        let result = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("560001", DeliveryOption::Standard),
                Utc::now(),
            )
            .await;
        match result {
            Err(CoreError::BusinessRule(message)) => {
                // No partner identifier leaks into the message.
                assert_eq!(message, "these items cannot be processed together");
            }
            other => panic!("expected business-rule rejection, got {other:?}"),
        }
        // Atomic: nothing changed.
        assert_eq!(cart.items.len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let mut product = mug(Uuid::new_v4());
        product.status = ProductStatus::Inactive;
        let product_id = product.id;
        let catalog = catalog_with(vec![product]);
        let assembler = OrderAssembler::new(PricingEngine::default());
        let resolver = resolver();

        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id,
            customization: CustomizationType::None,
            quantity: 10,
        });

        let result = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("560001", DeliveryOption::Standard),
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(CoreError::BusinessRule(_))));
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_unserviceable_and_express_unavailable() {
        let product = mug(Uuid::new_v4());
        let product_id = product.id;
        let catalog = catalog_with(vec![product]);
        let assembler = OrderAssembler::new(PricingEngine::default());
        let resolver = resolver();

        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id,
            customization: CustomizationType::None,
            quantity: 10,
        });

        let unknown_pin = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("999999", DeliveryOption::Standard),
                Utc::now(),
            )
            .await;
        assert!(matches!(unknown_pin, Err(CoreError::BusinessRule(_))));

        let no_express = assembler
            .checkout(
                &mut cart,
                &catalog,
                &resolver,
                request("790001", DeliveryOption::Express),
                Utc::now(),
            )
            .await;
        assert!(matches!(no_express, Err(CoreError::BusinessRule(_))));
        assert_eq!(cart.items.len(), 1);
    }
}
