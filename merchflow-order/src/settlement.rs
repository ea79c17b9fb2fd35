use crate::models::{Order, OrderStatus, Settlement, SettlementOrder};
use chrono::{DateTime, Utc};
use merchflow_core::PartnerProfile;
use merchflow_shared::money::{percent_of, round2};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Tiered default commission by final order amount. A partner-level
/// override always wins when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub tier1_below: Decimal,
    pub tier1_rate: Decimal,
    pub tier2_below: Decimal,
    pub tier2_rate: Decimal,
    pub default_rate: Decimal,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            tier1_below: Decimal::from(10_000),
            tier1_rate: Decimal::from(10),
            tier2_below: Decimal::from(50_000),
            tier2_rate: Decimal::from(12),
            default_rate: Decimal::from(15),
        }
    }
}

/// Live pending-settlement figures for a partner dashboard. Computed on
/// demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSettlement {
    pub order_count: usize,
    pub total_commission: Decimal,
    pub total_earnings: Decimal,
}

/// Aggregates delivered, not-yet-settled orders into per-partner payout
/// batches. The settled-order set is checked and extended inside the
/// same `&mut` call, so an order can never land in two settlements even
/// across repeated runs.
pub struct SettlementEngine {
    config: CommissionConfig,
    settlements: Vec<Settlement>,
    settled_orders: HashSet<Uuid>,
}

impl SettlementEngine {
    pub fn new(config: CommissionConfig) -> Self {
        Self {
            config,
            settlements: Vec::new(),
            settled_orders: HashSet::new(),
        }
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn is_settled(&self, order_id: Uuid) -> bool {
        self.settled_orders.contains(&order_id)
    }

    /// Commission percentage for one order.
    pub fn commission_rate(&self, partner_override: Option<Decimal>, order_total: Decimal) -> Decimal {
        if let Some(rate) = partner_override {
            return rate;
        }
        if order_total < self.config.tier1_below {
            self.config.tier1_rate
        } else if order_total < self.config.tier2_below {
            self.config.tier2_rate
        } else {
            self.config.default_rate
        }
    }

    /// Build the settlement batch for one partner over a period. Only
    /// orders delivered within `[period_start, period_end]` are
    /// eligible; anything outside waits for a later run.
    /// Returns `None` when no eligible order exists.
    pub fn build_settlement<'a>(
        &mut self,
        partner: &PartnerProfile,
        orders: impl Iterator<Item = &'a Order>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Option<&Settlement> {
        let mut rows = Vec::new();
        for order in orders {
            if order.partner_id != partner.id
                || order.status != OrderStatus::Delivered
                || self.settled_orders.contains(&order.id)
            {
                continue;
            }
            match order.delivered_at() {
                Some(at) if at >= period_start && at <= period_end => {}
                _ => continue,
            }
            rows.push(self.settle_order(partner, order));
            self.settled_orders.insert(order.id);
        }
        if rows.is_empty() {
            return None;
        }

        let total_sales = round2(rows.iter().map(|r| r.order_amount).sum());
        let total_commission = round2(rows.iter().map(|r| r.commission).sum());
        let net_payout = round2(rows.iter().map(|r| r.partner_earnings).sum());
        let settlement = Settlement {
            id: Uuid::new_v4(),
            partner_id: partner.id,
            settlement_number: Self::settlement_number(period_end),
            period_start,
            period_end,
            orders: rows,
            total_sales,
            total_commission,
            net_payout,
            created_at: Utc::now(),
        };
        tracing::info!(
            partner_id = %partner.id,
            settlement_number = %settlement.settlement_number,
            orders = settlement.orders.len(),
            "settlement created"
        );
        self.settlements.push(settlement);
        self.settlements.last()
    }

    /// Dashboard figures over delivered-but-unsettled orders.
    pub fn pending_for_partner<'a>(
        &self,
        partner: &PartnerProfile,
        orders: impl Iterator<Item = &'a Order>,
    ) -> PendingSettlement {
        let mut pending = PendingSettlement {
            order_count: 0,
            total_commission: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
        };
        for order in orders {
            if order.partner_id != partner.id
                || order.status != OrderStatus::Delivered
                || self.settled_orders.contains(&order.id)
            {
                continue;
            }
            let row = self.settle_order(partner, order);
            pending.order_count += 1;
            pending.total_commission = round2(pending.total_commission + row.commission);
            pending.total_earnings = round2(pending.total_earnings + row.partner_earnings);
        }
        pending
    }

    fn settle_order(&self, partner: &PartnerProfile, order: &Order) -> SettlementOrder {
        let amount = order.pricing.discounted_subtotal;
        let rate = self.commission_rate(partner.commission_override, order.pricing.total);
        let commission = percent_of(amount, rate);
        SettlementOrder {
            order_id: order.id,
            order_amount: amount,
            commission_rate: rate,
            commission,
            partner_earnings: round2(amount - commission),
        }
    }

    fn settlement_number(period_end: DateTime<Utc>) -> String {
        let short = Uuid::new_v4().simple().to_string();
        format!("STL-{}-{}", period_end.format("%Y%m"), &short[..8].to_uppercase())
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(CommissionConfig::default())
    }
}
