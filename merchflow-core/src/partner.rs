use crate::CoreResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerStatus {
    Active,
    Inactive,
    Suspended,
}

/// Snapshot of a fulfillment partner as seen by the engine. Partner
/// identity never appears in customer-facing payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerProfile {
    pub id: Uuid,
    pub status: PartnerStatus,
    /// Partner-level commission override in percent. When present it
    /// always wins over the tiered default.
    pub commission_override: Option<Decimal>,
    pub accepting_orders: bool,
}

impl PartnerProfile {
    pub fn is_routable(&self) -> bool {
        self.status == PartnerStatus::Active && self.accepting_orders
    }
}

/// Abstract partner-directory collaborator.
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    async fn get_partner(&self, id: Uuid) -> CoreResult<Option<PartnerProfile>>;
}

/// In-memory directory for tests.
#[derive(Default)]
pub struct MockPartnerDirectory {
    partners: HashMap<Uuid, PartnerProfile>,
}

impl MockPartnerDirectory {
    pub fn with_partners(partners: Vec<PartnerProfile>) -> Self {
        Self {
            partners: partners.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

#[async_trait]
impl PartnerDirectory for MockPartnerDirectory {
    async fn get_partner(&self, id: Uuid) -> CoreResult<Option<PartnerProfile>> {
        Ok(self.partners.get(&id).cloned())
    }
}
