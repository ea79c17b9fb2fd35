use chrono::{DateTime, Utc};
use merchflow_core::{CoreError, CoreResult};
use merchflow_shared::AuditEntry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountStatus {
    Pending,
    Approved,
    Disabled,
    Expired,
}

/// A product- or partner-scoped percentage discount with an approval
/// lifecycle and an optional validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub product_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub percentage: Decimal,
    pub status: DiscountStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub disabled_by: Option<String>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// Approved and inside its validity window at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == DiscountStatus::Approved
            && self.starts_at.map_or(true, |start| start < now)
            && self.ends_at.map_or(true, |end| end > now)
    }
}

/// Global bounds a proposed discount percentage must fall within.
/// Proposals outside the bounds are rejected, never clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountLimit {
    pub min_pct: Decimal,
    pub max_pct: Decimal,
}

impl Default for DiscountLimit {
    fn default() -> Self {
        Self {
            min_pct: Decimal::from(1),
            max_pct: Decimal::from(50),
        }
    }
}

/// Owns the discount lifecycle: propose, approve, disable, expire.
/// Every decision, including rejections, lands in the audit trail.
pub struct DiscountRegistry {
    discounts: HashMap<Uuid, Discount>,
    limit: DiscountLimit,
    audit: Vec<AuditEntry>,
}

impl DiscountRegistry {
    pub fn new(limit: DiscountLimit) -> Self {
        Self {
            discounts: HashMap::new(),
            limit,
            audit: Vec::new(),
        }
    }

    pub fn get(&self, id: Uuid) -> CoreResult<&Discount> {
        self.discounts
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("discount {id}")))
    }

    pub fn audit_trail(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// Propose a discount in PENDING. Rejects percentages outside the
    /// active limit as a business-rule violation.
    pub fn propose(
        &mut self,
        product_id: Uuid,
        partner_id: Option<Uuid>,
        percentage: Decimal,
        window: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
        actor: &str,
    ) -> CoreResult<Uuid> {
        if percentage < self.limit.min_pct || percentage > self.limit.max_pct {
            self.audit.push(AuditEntry::rejected(
                actor,
                "discount.propose",
                Some(format!(
                    "percentage {percentage} outside limit {}..{}",
                    self.limit.min_pct, self.limit.max_pct
                )),
            ));
            return Err(CoreError::BusinessRule(
                "discount percentage outside the permitted range".to_string(),
            ));
        }
        let discount = Discount {
            id: Uuid::new_v4(),
            product_id,
            partner_id,
            percentage,
            status: DiscountStatus::Pending,
            starts_at: window.0,
            ends_at: window.1,
            approved_by: None,
            approved_at: None,
            disabled_by: None,
            disabled_at: None,
            expired_at: None,
            created_at: Utc::now(),
        };
        let id = discount.id;
        self.discounts.insert(id, discount);
        self.audit
            .push(AuditEntry::applied(actor, "discount.propose", None));
        Ok(id)
    }

    /// Approve a PENDING discount. At most one approved discount may be
    /// active for a product at a time.
    pub fn approve(&mut self, id: Uuid, actor: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let product_id = self.get(id)?.product_id;
        if self.get(id)?.status != DiscountStatus::Pending {
            self.audit.push(AuditEntry::rejected(
                actor,
                "discount.approve",
                Some(format!("discount {id} is not pending")),
            ));
            return Err(CoreError::StateConflict(format!(
                "discount {id} is not pending approval"
            )));
        }
        let conflicting = self
            .discounts
            .values()
            .any(|d| d.id != id && d.product_id == product_id && d.is_active(now));
        if conflicting {
            self.audit.push(AuditEntry::rejected(
                actor,
                "discount.approve",
                Some(format!("product {product_id} already has an active discount")),
            ));
            return Err(CoreError::StateConflict(
                "product already has an active discount".to_string(),
            ));
        }
        // Both lookups above succeeded, so this entry exists.
        if let Some(discount) = self.discounts.get_mut(&id) {
            discount.status = DiscountStatus::Approved;
            discount.approved_by = Some(actor.to_string());
            discount.approved_at = Some(now);
        }
        self.audit
            .push(AuditEntry::applied(actor, "discount.approve", None));
        Ok(())
    }

    pub fn disable(&mut self, id: Uuid, actor: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let discount = self
            .discounts
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("discount {id}")))?;
        discount.status = DiscountStatus::Disabled;
        discount.disabled_by = Some(actor.to_string());
        discount.disabled_at = Some(now);
        self.audit
            .push(AuditEntry::applied(actor, "discount.disable", None));
        Ok(())
    }

    /// Flip approved discounts whose window has closed to EXPIRED,
    /// stamping when and writing each expiry to the audit trail.
    /// Returns the number expired.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for discount in self.discounts.values_mut() {
            if discount.status == DiscountStatus::Approved
                && discount.ends_at.is_some_and(|end| end <= now)
            {
                discount.status = DiscountStatus::Expired;
                discount.expired_at = Some(now);
                self.audit.push(AuditEntry::applied(
                    "system",
                    "discount.expire",
                    Some(format!("discount {}", discount.id)),
                ));
                expired += 1;
            }
        }
        expired
    }

    /// The active discount for a product at `now`. The data model allows
    /// at most one; if more exist the pick is deterministic (lowest id)
    /// and the invariant violation is logged rather than silently
    /// tolerated.
    pub fn active_discount(&self, product_id: Uuid, now: DateTime<Utc>) -> Option<&Discount> {
        let mut active: Vec<&Discount> = self
            .discounts
            .values()
            .filter(|d| d.product_id == product_id && d.is_active(now))
            .collect();
        if active.len() > 1 {
            tracing::warn!(
                product_id = %product_id,
                count = active.len(),
                "multiple active discounts for product; taking lowest id"
            );
        }
        active.sort_by_key(|d| d.id);
        active.first().copied()
    }
}

impl Default for DiscountRegistry {
    fn default() -> Self {
        Self::new(DiscountLimit::default())
    }
}
