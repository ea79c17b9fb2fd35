use crate::assembler::{CheckoutRequest, OrderAssembler};
use crate::lifecycle::OrderManager;
use crate::models::{OrderStatus, OrderView, PartnerOrderStatus, Settlement};
use crate::refund::{RefundCalculator, RefundLedger};
use crate::settlement::{PendingSettlement, SettlementEngine};
use crate::routing::PartnerRouter;
use chrono::{DateTime, Utc};
use merchflow_catalog::ProductCatalog;
use merchflow_core::{
    CoreError, CoreResult, Notifier, PartnerDirectory, PaymentGateway, ServiceabilityResolver,
};
use merchflow_shared::{AuditEntry, NotificationEvent};
use std::sync::Arc;
use uuid::Uuid;

/// The engine facade: every caller-visible operation goes through here,
/// one short-lived unit of work at a time. Holding the services behind
/// `&mut self` serializes racing operations on the same order.
pub struct OrderEngine {
    assembler: OrderAssembler,
    pub manager: OrderManager,
    pub router: PartnerRouter,
    pub refunds: RefundLedger,
    pub settlements: SettlementEngine,
    gateway: Arc<dyn PaymentGateway>,
    directory: Arc<dyn PartnerDirectory>,
    resolver: Arc<dyn ServiceabilityResolver>,
    notifier: Arc<dyn Notifier>,
}

impl OrderEngine {
    pub fn new(
        assembler: OrderAssembler,
        settlements: SettlementEngine,
        gateway: Arc<dyn PaymentGateway>,
        directory: Arc<dyn PartnerDirectory>,
        resolver: Arc<dyn ServiceabilityResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            assembler,
            manager: OrderManager::new(),
            router: PartnerRouter::new(),
            refunds: RefundLedger::new(),
            settlements,
            gateway,
            directory,
            resolver,
            notifier,
        }
    }

    /// Checkout: cart -> priced immutable order in PENDING_PAYMENT.
    pub async fn create_order(
        &mut self,
        cart: &mut crate::models::Cart,
        catalog: &ProductCatalog,
        request: CheckoutRequest,
    ) -> CoreResult<Uuid> {
        let order = self
            .assembler
            .checkout(cart, catalog, self.resolver.as_ref(), request, Utc::now())
            .await?;
        Ok(self.manager.insert(order))
    }

    pub fn get_order(&self, order_id: Uuid) -> CoreResult<OrderView> {
        self.manager.view(order_id)
    }

    /// Payment success: confirm the order and route it to its partner.
    pub async fn confirm_payment(&mut self, order_id: Uuid) -> CoreResult<()> {
        // Validate the edge before touching the gateway.
        let current = self.manager.get(order_id)?.status;
        if current != OrderStatus::PendingPayment {
            return Err(CoreError::StateConflict(format!(
                "order {order_id} is not awaiting payment"
            )));
        }
        let confirmation = self.gateway.confirm_payment(order_id).await?;
        self.manager
            .attach_payment(order_id, confirmation.payment_reference)?;
        self.manager
            .transition(order_id, OrderStatus::Confirmed, "payment", None)?;

        let order = self.manager.get(order_id)?;
        let (buyer_id, partner_id, total) =
            (order.buyer_id, order.partner_id, order.pricing.total);
        self.notifier
            .notify(buyer_id, NotificationEvent::OrderConfirmed { order_id, total })
            .await;

        // Routing happens once, automatically, on CONFIRMED.
        let profile = self.directory.get_partner(partner_id).await?;
        let order = self.manager.get(order_id)?;
        self.router.route(order, profile)?;
        self.notifier
            .notify(partner_id, NotificationEvent::OrderAssigned { order_id })
            .await;
        Ok(())
    }

    /// Payment failure, reported by the gateway or the timeout sweep.
    pub fn fail_payment(&mut self, order_id: Uuid) -> CoreResult<()> {
        self.manager
            .transition(order_id, OrderStatus::PaymentFailed, "payment", None)
    }

    /// Partner accepts the assignment.
    pub async fn partner_accept(&mut self, order_id: Uuid) -> CoreResult<()> {
        self.partner_transition(order_id, PartnerOrderStatus::Accepted, None)
            .await
    }

    /// Partner rejects the assignment. The reason stays internal; the
    /// order remains CONFIRMED pending manual reassignment.
    pub async fn partner_reject(&mut self, order_id: Uuid, reason: String) -> CoreResult<()> {
        self.partner_transition(order_id, PartnerOrderStatus::Rejected, Some(reason))
            .await
    }

    /// Production milestones: IN_PRODUCTION or READY_TO_SHIP.
    pub async fn update_production_status(
        &mut self,
        order_id: Uuid,
        milestone: PartnerOrderStatus,
    ) -> CoreResult<()> {
        if !matches!(
            milestone,
            PartnerOrderStatus::InProduction | PartnerOrderStatus::ReadyToShip
        ) {
            return Err(CoreError::Validation(format!(
                "{milestone:?} is not a production milestone"
            )));
        }
        self.partner_transition(order_id, milestone, None).await
    }

    pub async fn ship(&mut self, order_id: Uuid) -> CoreResult<()> {
        self.partner_transition(order_id, PartnerOrderStatus::Shipped, None)
            .await
    }

    /// Delivery-webhook event: the courier has the parcel out.
    pub fn out_for_delivery(&mut self, order_id: Uuid) -> CoreResult<()> {
        self.manager
            .transition(order_id, OrderStatus::OutForDelivery, "delivery-webhook", None)
    }

    /// Delivery-webhook event: delivered. Closes both machines.
    pub async fn delivered(&mut self, order_id: Uuid) -> CoreResult<()> {
        self.partner_transition(order_id, PartnerOrderStatus::Delivered, None)
            .await
    }

    /// Customer-initiated cancellation with the status-keyed refund
    /// policy. A second attempt fails the eligibility check because the
    /// status has already left the cancellable set.
    pub async fn cancel(&mut self, order_id: Uuid, reason: String) -> CoreResult<()> {
        let order = self.manager.get(order_id)?;
        let status = order.status;
        if !status.is_cancellable() {
            self.manager.record_audit(
                order_id,
                AuditEntry::rejected(
                    "customer",
                    "order.cancel",
                    Some(format!("not cancellable from {status:?}")),
                ),
            )?;
            return Err(CoreError::StateConflict(format!(
                "order {order_id} can no longer be cancelled"
            )));
        }

        let refund_amount = RefundCalculator::refund_amount(status, order.pricing.total)?;
        let buyer_id = order.buyer_id;
        let payment_reference = order.payment_reference.clone();
        let paid = payment_reference.is_some();

        self.manager
            .transition(order_id, OrderStatus::Cancelled, "customer", Some(reason.clone()))?;
        self.manager.record_cancellation(order_id, reason.clone())?;

        // No payment captured: nothing to refund, no refund record.
        if let Some(payment_reference) = payment_reference {
            self.manager
                .transition(order_id, OrderStatus::RefundInitiated, "system", None)?;
            self.refunds
                .open(order_id, payment_reference.clone(), refund_amount, reason)?;
            let gateway_refund_id = self
                .gateway
                .initiate_refund(&payment_reference, refund_amount)
                .await?;
            self.refunds.mark_processing(order_id, gateway_refund_id)?;
        }

        self.notifier
            .notify(
                buyer_id,
                NotificationEvent::OrderCancelled {
                    order_id,
                    refund_amount: if paid {
                        refund_amount
                    } else {
                        rust_decimal::Decimal::ZERO
                    },
                },
            )
            .await;
        Ok(())
    }

    /// Asynchronous gateway callback with the refund outcome.
    pub async fn refund_callback(
        &mut self,
        order_id: Uuid,
        success: bool,
        failure_reason: Option<String>,
    ) -> CoreResult<()> {
        self.refunds.resolve(order_id, success, failure_reason)?;
        if success {
            self.manager
                .transition(order_id, OrderStatus::Refunded, "gateway", None)?;
        }
        // On failure the order status is left unchanged; manual retry is
        // an admin concern outside this engine.
        let order = self.manager.get(order_id)?;
        let refund_id = self.refunds.get(order_id)?.id;
        self.notifier
            .notify(
                order.buyer_id,
                NotificationEvent::RefundResolved {
                    order_id,
                    refund_id,
                    success,
                },
            )
            .await;
        Ok(())
    }

    /// Periodic settlement run for one partner.
    pub async fn run_settlement(
        &mut self,
        partner_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CoreResult<Option<Settlement>> {
        let profile = self
            .directory
            .get_partner(partner_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("partner {partner_id}")))?;
        let settlement = self
            .settlements
            .build_settlement(&profile, self.manager.orders(), period_start, period_end)
            .cloned();
        if let Some(settlement) = &settlement {
            self.notifier
                .notify(
                    partner_id,
                    NotificationEvent::SettlementCreated {
                        settlement_id: settlement.id,
                        settlement_number: settlement.settlement_number.clone(),
                        net_payout: settlement.net_payout,
                    },
                )
                .await;
        }
        Ok(settlement)
    }

    /// Live dashboard figures; never persisted.
    pub async fn pending_settlement(&self, partner_id: Uuid) -> CoreResult<PendingSettlement> {
        let profile = self
            .directory
            .get_partner(partner_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("partner {partner_id}")))?;
        Ok(self
            .settlements
            .pending_for_partner(&profile, self.manager.orders()))
    }

    /// The single function through which every partner transition flows.
    /// It advances the partner machine and applies the data-driven
    /// mirror to the order machine, then notifies the buyer with a
    /// client-safe description.
    async fn partner_transition(
        &mut self,
        order_id: Uuid,
        next: PartnerOrderStatus,
        rejection_reason: Option<String>,
    ) -> CoreResult<()> {
        // Validate the mirrored order edge before committing the partner
        // advance: if the order can no longer follow (e.g. it was
        // cancelled), neither machine moves.
        if let Some(order_status) = next.mirrored_order_status() {
            let current = self.manager.get(order_id)?.status;
            if !current.can_transition_to(order_status) {
                self.manager.record_audit(
                    order_id,
                    AuditEntry::rejected(
                        "partner",
                        &format!("order.transition/{current:?}->{order_status:?}"),
                        Some("illegal transition".to_string()),
                    ),
                )?;
                return Err(CoreError::StateConflict(format!(
                    "order {order_id} cannot move from {current:?} to {order_status:?}"
                )));
            }
        }
        let mirror = self.router.advance(order_id, next, rejection_reason)?;
        match mirror {
            Some(order_status) => {
                self.manager
                    .transition(order_id, order_status, "partner", None)?;
                let order = self.manager.get(order_id)?;
                self.notifier
                    .notify(
                        order.buyer_id,
                        NotificationEvent::FulfillmentMilestone {
                            order_id,
                            status: order_status.customer_description().to_string(),
                        },
                    )
                    .await;
            }
            None => {
                // Rejection: no customer-visible movement, but the signal
                // lands in the order's audit trail.
                self.manager.record_audit(
                    order_id,
                    AuditEntry::rejected(
                        "partner",
                        "assignment.rejected",
                        Some("manual reassignment required".to_string()),
                    ),
                )?;
            }
        }
        Ok(())
    }
}
