use crate::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// PIN-code resolution result from the address collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinCodeInfo {
    pub city: String,
    pub state: String,
    pub serviceable: bool,
    pub express_available: bool,
}

/// Abstract address/serviceability collaborator.
#[async_trait]
pub trait ServiceabilityResolver: Send + Sync {
    async fn resolve(&self, pin_code: &str) -> CoreResult<Option<PinCodeInfo>>;
}

/// In-memory resolver for tests, keyed by exact PIN code.
#[derive(Default)]
pub struct MockServiceabilityResolver {
    pins: HashMap<String, PinCodeInfo>,
}

impl MockServiceabilityResolver {
    pub fn with_pin(mut self, pin_code: &str, info: PinCodeInfo) -> Self {
        self.pins.insert(pin_code.to_string(), info);
        self
    }
}

#[async_trait]
impl ServiceabilityResolver for MockServiceabilityResolver {
    async fn resolve(&self, pin_code: &str) -> CoreResult<Option<PinCodeInfo>> {
        Ok(self.pins.get(pin_code).cloned())
    }
}
