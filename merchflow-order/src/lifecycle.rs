use crate::models::{Order, OrderStatus, OrderView, StatusHistory};
use chrono::Utc;
use merchflow_core::{CoreError, CoreResult};
use merchflow_shared::AuditEntry;
use std::collections::HashMap;
use uuid::Uuid;

/// Owns every order and is the only writer of order status. Taking
/// `&mut self` serializes concurrent transition attempts: a transition
/// reads the current state, validates it against the graph, and writes
/// the new state plus history as one unit.
pub struct OrderManager {
    orders: HashMap<Uuid, Order>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    pub fn insert(&mut self, order: Order) -> Uuid {
        let id = order.id;
        self.orders.insert(id, order);
        id
    }

    pub fn get(&self, order_id: Uuid) -> CoreResult<&Order> {
        self.orders
            .get(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))
    }

    pub fn view(&self, order_id: Uuid) -> CoreResult<OrderView> {
        self.get(order_id).map(OrderView::from)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Apply one transition. Illegal edges are rejected with a state
    /// conflict and still leave an audit record of the attempt.
    pub fn transition(
        &mut self,
        order_id: Uuid,
        next: OrderStatus,
        actor: &str,
        note: Option<String>,
    ) -> CoreResult<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

        let current = order.status;
        let action = format!("order.transition/{current:?}->{next:?}");
        if !current.can_transition_to(next) {
            order.audit.push(AuditEntry::rejected(
                actor,
                &action,
                Some("illegal transition".to_string()),
            ));
            return Err(CoreError::StateConflict(format!(
                "order {order_id} cannot move from {current:?} to {next:?}"
            )));
        }

        let now = Utc::now();
        order.status = next;
        order.updated_at = now;
        order.history.push(StatusHistory {
            status: next,
            description: next.customer_description().to_string(),
            at: now,
        });
        order.audit.push(AuditEntry::applied(actor, &action, note));
        tracing::info!(order_id = %order_id, from = ?current, to = ?next, "order transitioned");
        Ok(())
    }

    /// Record the captured payment reference on the order.
    pub fn attach_payment(&mut self, order_id: Uuid, reference: String) -> CoreResult<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;
        order.payment_reference = Some(reference);
        Ok(())
    }

    pub fn record_cancellation(
        &mut self,
        order_id: Uuid,
        reason: String,
    ) -> CoreResult<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;
        order.cancellation_reason = Some(reason);
        order.cancelled_at = Some(Utc::now());
        Ok(())
    }

    /// Append an audit entry without a status change, e.g. a rejected
    /// cancellation attempt or a partner rejection signal.
    pub fn record_audit(&mut self, order_id: Uuid, entry: AuditEntry) -> CoreResult<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;
        order.audit.push(entry);
        Ok(())
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryAddress, Order};
    use merchflow_catalog::{DeliveryOption, PriceBreakdown, Savings, TaxBreakdown};
    use rust_decimal::Decimal;

    fn test_order() -> Order {
        Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Vec::new(),
            PriceBreakdown {
                original_subtotal: Decimal::from(10_000),
                discounted_subtotal: Decimal::from(10_000),
                tax: TaxBreakdown {
                    cgst: Decimal::from(900),
                    sgst: Decimal::from(900),
                    igst: Decimal::ZERO,
                },
                delivery_charge: Decimal::from(99),
                total: Decimal::from(11_899),
                savings: Savings {
                    amount: Decimal::ZERO,
                    percent: Decimal::ZERO,
                },
            },
            DeliveryAddress {
                line: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pin_code: "560001".to_string(),
            },
            DeliveryOption::Standard,
            Utc::now(),
        )
    }

    #[test]
    fn test_full_lifecycle_writes_history() {
        let mut manager = OrderManager::new();
        let order_id = manager.insert(test_order());

        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Accepted,
            OrderStatus::InProduction,
            OrderStatus::ReadyToShip,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            manager.transition(order_id, next, "system", None).unwrap();
        }

        let order = manager.get(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        // Initial PENDING_PAYMENT entry plus seven transitions.
        assert_eq!(order.history.len(), 8);
        assert_eq!(order.audit.len(), 7);
    }

    #[test]
    fn test_illegal_transition_rejected_and_audited() {
        let mut manager = OrderManager::new();
        let order_id = manager.insert(test_order());

        let result = manager.transition(order_id, OrderStatus::Shipped, "system", None);
        assert!(matches!(result, Err(CoreError::StateConflict(_))));

        let order = manager.get(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.history.len(), 1); // no history for rejected attempts
        assert_eq!(order.audit.len(), 1); // but the attempt is audited
    }

    #[test]
    fn test_view_hides_partner_identity() {
        let mut manager = OrderManager::new();
        let order_id = manager.insert(test_order());

        let view = manager.view(order_id).unwrap();
        let payload = serde_json::to_string(&view).unwrap();
        let partner_id = manager.get(order_id).unwrap().partner_id;
        assert!(!payload.contains(&partner_id.to_string()));
        assert!(!payload.contains("audit"));
    }
}
