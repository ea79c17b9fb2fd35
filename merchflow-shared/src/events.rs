use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of an audited action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Applied,
    Rejected,
}

/// Immutable audit record. Written for every transition attempt,
/// including rejected ones, and for every discount decision.
/// The `note` field is internal-only and never reaches customer payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub outcome: AuditOutcome,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn applied(actor: &str, action: &str, note: Option<String>) -> Self {
        Self::new(actor, action, AuditOutcome::Applied, note)
    }

    pub fn rejected(actor: &str, action: &str, note: Option<String>) -> Self {
        Self::new(actor, action, AuditOutcome::Rejected, note)
    }

    fn new(actor: &str, action: &str, outcome: AuditOutcome, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            outcome,
            note,
            at: Utc::now(),
        }
    }
}

/// Fire-and-forget notification payloads. Delivery is an external
/// collaborator; these events are never read back by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "event")]
pub enum NotificationEvent {
    OrderConfirmed {
        order_id: Uuid,
        total: Decimal,
    },
    OrderAssigned {
        order_id: Uuid,
    },
    FulfillmentMilestone {
        order_id: Uuid,
        status: String,
    },
    OrderCancelled {
        order_id: Uuid,
        refund_amount: Decimal,
    },
    RefundResolved {
        order_id: Uuid,
        refund_id: Uuid,
        success: bool,
    },
    SettlementCreated {
        settlement_id: Uuid,
        settlement_number: String,
        net_payout: Decimal,
    },
}
