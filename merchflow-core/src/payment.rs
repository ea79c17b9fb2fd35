use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a successful payment capture at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_reference: String,
    pub captured_at: DateTime<Utc>,
}

/// Abstract payment collaborator. The engine invokes it synchronously
/// within the operation that needs it; gateway failures surface as
/// `CoreError::Dependency` with no retry loop inside the core.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Confirm (capture) the payment for an order.
    async fn confirm_payment(&self, order_id: Uuid) -> CoreResult<PaymentConfirmation>;

    /// Start a refund against a captured payment. Returns the gateway's
    /// refund reference; the final success/failure arrives via callback.
    async fn initiate_refund(&self, payment_reference: &str, amount: Decimal)
        -> CoreResult<String>;
}

/// In-memory gateway for tests. A payment reference containing
/// "fail" makes refund initiation fail, to exercise dependency-error paths.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn confirm_payment(&self, order_id: Uuid) -> CoreResult<PaymentConfirmation> {
        Ok(PaymentConfirmation {
            payment_reference: format!("pay_{}", order_id.simple()),
            captured_at: Utc::now(),
        })
    }

    async fn initiate_refund(
        &self,
        payment_reference: &str,
        _amount: Decimal,
    ) -> CoreResult<String> {
        if payment_reference.contains("fail") {
            return Err(CoreError::Dependency(
                "refund initiation rejected by gateway".to_string(),
            ));
        }
        Ok(format!("rfnd_{}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_round_trip() {
        let gateway = MockPaymentGateway;
        let order_id = Uuid::new_v4();

        let confirmation = gateway.confirm_payment(order_id).await.unwrap();
        assert!(confirmation.payment_reference.starts_with("pay_"));

        let refund_ref = gateway
            .initiate_refund(&confirmation.payment_reference, Decimal::from(100))
            .await
            .unwrap();
        assert!(refund_ref.starts_with("rfnd_"));
    }

    #[tokio::test]
    async fn test_mock_gateway_refund_failure() {
        let gateway = MockPaymentGateway;
        let result = gateway
            .initiate_refund("pay_fail_case", Decimal::from(100))
            .await;
        assert!(matches!(result, Err(CoreError::Dependency(_))));
    }
}
