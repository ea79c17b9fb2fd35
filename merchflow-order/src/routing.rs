use crate::models::{Order, OrderPartnerAssignment, PartnerOrderStatus};
use chrono::Utc;
use merchflow_core::{CoreError, CoreResult, PartnerProfile};
use std::collections::HashMap;
use uuid::Uuid;

/// Routes each confirmed order to its pinned partner and owns the
/// partner fulfillment state machine. Keying assignments by order id is
/// the structural guarantee of at most one assignment per order.
pub struct PartnerRouter {
    assignments: HashMap<Uuid, OrderPartnerAssignment>,
}

impl PartnerRouter {
    pub fn new() -> Self {
        Self {
            assignments: HashMap::new(),
        }
    }

    pub fn assignment(&self, order_id: Uuid) -> CoreResult<&OrderPartnerAssignment> {
        self.assignments
            .get(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("assignment for order {order_id}")))
    }

    /// Route a confirmed order to the partner pinned at assembly. If the
    /// partner is missing or not routable, this raises the
    /// manual-intervention signal instead of silently proceeding; the
    /// customer-facing message stays generic.
    pub fn route(
        &mut self,
        order: &Order,
        profile: Option<PartnerProfile>,
    ) -> CoreResult<&OrderPartnerAssignment> {
        if self.assignments.contains_key(&order.id) {
            return Err(CoreError::StateConflict(format!(
                "order {} is already routed",
                order.id
            )));
        }
        let routable = profile.as_ref().is_some_and(|p| p.is_routable());
        if !routable {
            tracing::error!(
                order_id = %order.id,
                "routing failed, manual intervention required"
            );
            return Err(CoreError::Dependency("unable to process order".to_string()));
        }
        let assignment = OrderPartnerAssignment::new(order.id, order.partner_id);
        Ok(self.assignments.entry(order.id).or_insert(assignment))
    }

    /// The single partner-transition function. Validates the forward-only
    /// edge, stamps milestone timestamps, and returns the order-status
    /// mirror for the caller to apply, so the two machines stay in
    /// lockstep through one mapping.
    pub fn advance(
        &mut self,
        order_id: Uuid,
        next: PartnerOrderStatus,
        rejection_reason: Option<String>,
    ) -> CoreResult<Option<crate::models::OrderStatus>> {
        let assignment = self
            .assignments
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("assignment for order {order_id}")))?;

        let current = assignment.status;
        if !current.can_advance_to(next) {
            return Err(CoreError::StateConflict(format!(
                "assignment for order {order_id} cannot move from {current:?} to {next:?}"
            )));
        }

        let now = Utc::now();
        assignment.status = next;
        match next {
            PartnerOrderStatus::Accepted => assignment.accepted_at = Some(now),
            PartnerOrderStatus::Shipped => assignment.shipped_at = Some(now),
            PartnerOrderStatus::Delivered => assignment.delivered_at = Some(now),
            PartnerOrderStatus::Rejected => {
                // Reason is internal only; rejection never auto-reassigns.
                assignment.rejection_reason = rejection_reason;
                tracing::error!(
                    order_id = %order_id,
                    "partner rejected assignment, manual intervention required"
                );
            }
            _ => {}
        }
        tracing::info!(order_id = %order_id, from = ?current, to = ?next, "assignment advanced");
        Ok(next.mirrored_order_status())
    }
}

impl Default for PartnerRouter {
    fn default() -> Self {
        Self::new()
    }
}
