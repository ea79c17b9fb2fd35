use crate::models::{OrderStatus, Refund, RefundStatus};
use chrono::Utc;
use merchflow_core::{CoreError, CoreResult};
use merchflow_shared::round2;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Pure refund policy: the amount is a function of the order status at
/// the moment of cancellation, nothing else.
pub struct RefundCalculator;

impl RefundCalculator {
    /// Fraction of the paid total refunded on cancellation. `None`
    /// means the status is not cancellable at all.
    pub fn refund_fraction(status: OrderStatus) -> Option<Decimal> {
        match status {
            OrderStatus::PendingPayment | OrderStatus::Confirmed => Some(Decimal::ONE),
            // 10% non-refundable processing fee once production is accepted.
            OrderStatus::Accepted => Some(Decimal::new(9, 1)),
            _ => None,
        }
    }

    /// Refund amount for cancelling at `status`, rejected outright for
    /// any non-cancellable status.
    pub fn refund_amount(status: OrderStatus, total: Decimal) -> CoreResult<Decimal> {
        let fraction = Self::refund_fraction(status).ok_or_else(|| {
            CoreError::StateConflict(format!("order in {status:?} cannot be cancelled"))
        })?;
        Ok(round2(total * fraction))
    }
}

/// Owns refund records. One slot per order makes a second refund for
/// the same order structurally impossible.
pub struct RefundLedger {
    refunds: HashMap<Uuid, Refund>,
}

impl RefundLedger {
    pub fn new() -> Self {
        Self {
            refunds: HashMap::new(),
        }
    }

    pub fn get(&self, order_id: Uuid) -> CoreResult<&Refund> {
        self.refunds
            .get(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("refund for order {order_id}")))
    }

    /// Open a refund in INITIATED. Idempotence guard: a second refund
    /// for the same order is a state conflict.
    pub fn open(
        &mut self,
        order_id: Uuid,
        payment_reference: String,
        amount: Decimal,
        reason: String,
    ) -> CoreResult<&Refund> {
        if self.refunds.contains_key(&order_id) {
            return Err(CoreError::StateConflict(format!(
                "refund already exists for order {order_id}"
            )));
        }
        let now = Utc::now();
        let refund = Refund {
            id: Uuid::new_v4(),
            order_id,
            payment_reference,
            amount,
            reason,
            status: RefundStatus::Initiated,
            gateway_refund_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        Ok(self.refunds.entry(order_id).or_insert(refund))
    }

    /// The gateway accepted the refund request.
    pub fn mark_processing(&mut self, order_id: Uuid, gateway_refund_id: String) -> CoreResult<()> {
        let refund = self.get_mut(order_id)?;
        refund.status = RefundStatus::Processing;
        refund.gateway_refund_id = Some(gateway_refund_id);
        refund.updated_at = Utc::now();
        Ok(())
    }

    /// Gateway callback outcome. A failure records the reason and leaves
    /// the refund eligible for an out-of-scope manual retry.
    pub fn resolve(
        &mut self,
        order_id: Uuid,
        success: bool,
        failure_reason: Option<String>,
    ) -> CoreResult<RefundStatus> {
        let refund = self.get_mut(order_id)?;
        if refund.status == RefundStatus::Success {
            return Err(CoreError::StateConflict(format!(
                "refund for order {order_id} already succeeded"
            )));
        }
        refund.status = if success {
            RefundStatus::Success
        } else {
            refund.failure_reason = failure_reason;
            RefundStatus::Failed
        };
        refund.updated_at = Utc::now();
        Ok(refund.status)
    }

    fn get_mut(&mut self, order_id: Uuid) -> CoreResult<&mut Refund> {
        self.refunds
            .get_mut(&order_id)
            .ok_or_else(|| CoreError::NotFound(format!("refund for order {order_id}")))
    }
}

impl Default for RefundLedger {
    fn default() -> Self {
        Self::new()
    }
}
