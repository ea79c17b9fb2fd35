pub mod address;
pub mod notify;
pub mod partner;
pub mod payment;

pub use address::{MockServiceabilityResolver, PinCodeInfo, ServiceabilityResolver};
pub use notify::{Notifier, NullNotifier, RecordingNotifier};
pub use partner::{MockPartnerDirectory, PartnerDirectory, PartnerProfile, PartnerStatus};
pub use payment::{MockPaymentGateway, PaymentConfirmation, PaymentGateway};

/// Error taxonomy shared by every engine operation. All failures are
/// returned as values; none are used for internal control flow.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad input shape or range (quantity out of bounds, tier gaps).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal state transition, double cancellation, double settlement.
    /// Never retried automatically.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Business rule violated (discount outside limits, multi-partner
    /// cart, non-serviceable PIN). Never retried automatically.
    #[error("{0}")]
    BusinessRule(String),

    /// Payment gateway or webhook collaborator failure. Retries, if any,
    /// belong to the calling infrastructure.
    #[error("Dependency failure: {0}")]
    Dependency(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
