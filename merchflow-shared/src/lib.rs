pub mod events;
pub mod money;

pub use events::{AuditEntry, AuditOutcome, NotificationEvent};
pub use money::{percent_of, round1, round2, round4};
