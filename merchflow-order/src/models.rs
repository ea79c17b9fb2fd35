use chrono::{DateTime, Duration, Utc};
use merchflow_catalog::{CustomizationType, DeliveryOption, PriceBreakdown};
use merchflow_shared::AuditEntry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes after checkout before the payment-timeout sweep may fail the
/// order. Enforcement is external; the deadline is pinned here.
pub const PAYMENT_TIMEOUT_MINUTES: i64 = 15;

/// Customer-visible order lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    PaymentFailed,
    Confirmed,
    Accepted,
    InProduction,
    ReadyToShip,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    RefundInitiated,
    Refunded,
}

impl OrderStatus {
    /// The complete transition graph. Anything not listed here is an
    /// illegal transition and must fail with a state conflict.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (PendingPayment, PaymentFailed)
                | (PendingPayment, Cancelled)
                | (Confirmed, Accepted)
                | (Confirmed, Cancelled)
                | (Accepted, InProduction)
                | (Accepted, Cancelled)
                | (InProduction, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (Cancelled, RefundInitiated)
                | (Delivered, RefundInitiated)
                | (RefundInitiated, Refunded)
        )
    }

    /// Customer-initiated cancellation is allowed only here.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::Confirmed | OrderStatus::Accepted
        )
    }

    /// Customer-facing description for the status history. Deliberately
    /// generic: never names the partner or internal reasons.
    pub fn customer_description(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "Order placed, awaiting payment",
            OrderStatus::PaymentFailed => "Payment was not completed",
            OrderStatus::Confirmed => "Payment received, order confirmed",
            OrderStatus::Accepted => "Order accepted for production",
            OrderStatus::InProduction => "Your items are in production",
            OrderStatus::ReadyToShip => "Your items are packed and ready to ship",
            OrderStatus::Shipped => "Your order has shipped",
            OrderStatus::OutForDelivery => "Your order is out for delivery",
            OrderStatus::Delivered => "Your order was delivered",
            OrderStatus::Cancelled => "Your order was cancelled",
            OrderStatus::RefundInitiated => "Your refund is being processed",
            OrderStatus::Refunded => "Your refund is complete",
        }
    }
}

/// Internal sub-lifecycle of one partner's fulfillment of one order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerOrderStatus {
    AwaitingAcceptance,
    Accepted,
    Rejected,
    InProduction,
    ReadyToShip,
    Shipped,
    Delivered,
}

impl PartnerOrderStatus {
    /// Forward-only edges; skipping a step is illegal. Rejection is the
    /// only exit from AwaitingAcceptance besides acceptance.
    pub fn can_advance_to(self, next: PartnerOrderStatus) -> bool {
        use PartnerOrderStatus::*;
        matches!(
            (self, next),
            (AwaitingAcceptance, Accepted)
                | (AwaitingAcceptance, Rejected)
                | (Accepted, InProduction)
                | (InProduction, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, Delivered)
        )
    }

    /// The data-driven mirror into the customer-visible machine. One
    /// mapping, consulted by the single partner-transition function, so
    /// the two machines cannot drift apart. Rejection has no mirror: it
    /// raises a manual-intervention signal instead.
    pub fn mirrored_order_status(self) -> Option<OrderStatus> {
        match self {
            PartnerOrderStatus::Accepted => Some(OrderStatus::Accepted),
            PartnerOrderStatus::InProduction => Some(OrderStatus::InProduction),
            PartnerOrderStatus::ReadyToShip => Some(OrderStatus::ReadyToShip),
            PartnerOrderStatus::Shipped => Some(OrderStatus::Shipped),
            PartnerOrderStatus::Delivered => Some(OrderStatus::Delivered),
            PartnerOrderStatus::AwaitingAcceptance | PartnerOrderStatus::Rejected => None,
        }
    }
}

/// A buyer's cart, mutable until checkout converts it to an Order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new(buyer_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: CartItem) {
        self.items.push(item);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub customization: CustomizationType,
    pub quantity: u32,
}

/// Pinned delivery address snapshot. The resolved city/state come from
/// the serviceability collaborator at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub line: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
}

/// A priced line inside an order, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub customization: CustomizationType,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub customization_fee: Decimal,
    pub discount_pct: Decimal,
    pub subtotal: Decimal,
    pub discounted_subtotal: Decimal,
}

/// One entry of the customer-facing status history. Internal notes live
/// in the audit trail, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistory {
    pub status: OrderStatus,
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Immutable priced snapshot of a checkout. Mutated only by
/// state-machine transitions; never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    /// Exactly one fulfillment partner, pinned from the first cart item
    /// at assembly. Never exposed in customer-facing views.
    pub partner_id: Uuid,
    pub items: Vec<OrderItem>,
    pub pricing: PriceBreakdown,
    pub delivery_address: DeliveryAddress,
    pub delivery_option: DeliveryOption,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub payment_deadline: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusHistory>,
    pub audit: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        buyer_id: Uuid,
        partner_id: Uuid,
        items: Vec<OrderItem>,
        pricing: PriceBreakdown,
        delivery_address: DeliveryAddress,
        delivery_option: DeliveryOption,
        now: DateTime<Utc>,
    ) -> Self {
        let status = OrderStatus::PendingPayment;
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            partner_id,
            items,
            pricing,
            delivery_address,
            delivery_option,
            status,
            payment_reference: None,
            payment_deadline: now + Duration::minutes(PAYMENT_TIMEOUT_MINUTES),
            cancellation_reason: None,
            cancelled_at: None,
            history: vec![StatusHistory {
                status,
                description: status.customer_description().to_string(),
                at: now,
            }],
            audit: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn paid(&self) -> bool {
        self.payment_reference.is_some()
    }

    /// When the order reached `Delivered`, taken from status history.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .find(|entry| entry.status == OrderStatus::Delivered)
            .map(|entry| entry.at)
    }
}

/// Customer-facing order snapshot: no partner identity, no internal
/// notes, no rejection reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub pricing: PriceBreakdown,
    pub delivery_address: DeliveryAddress,
    pub history: Vec<StatusHistory>,
    pub payment_deadline: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            items: order.items.clone(),
            pricing: order.pricing.clone(),
            delivery_address: order.delivery_address.clone(),
            history: order.history.clone(),
            payment_deadline: order.payment_deadline,
        }
    }
}

/// One-to-one with an order; created by routing, never re-created for
/// the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPartnerAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub status: PartnerOrderStatus,
    pub rejection_reason: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderPartnerAssignment {
    pub fn new(order_id: Uuid, partner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            partner_id,
            status: PartnerOrderStatus::AwaitingAcceptance,
            rejection_reason: None,
            assigned_at: Utc::now(),
            accepted_at: None,
            shipped_at: None,
            delivered_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Initiated,
    Processing,
    Success,
    Failed,
}

/// At most one refund per order; at most one may ever succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_reference: String,
    pub amount: Decimal,
    pub reason: String,
    pub status: RefundStatus,
    pub gateway_refund_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable commission row for one delivered order inside a settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOrder {
    pub order_id: Uuid,
    pub order_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission: Decimal,
    pub partner_earnings: Decimal,
}

/// A periodic payout batch for one partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub settlement_number: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub orders: Vec<SettlementOrder>,
    pub total_sales: Decimal,
    pub total_commission: Decimal,
    pub net_payout: Decimal,
    pub created_at: DateTime<Utc>,
}
