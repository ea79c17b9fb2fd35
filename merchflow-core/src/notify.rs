use async_trait::async_trait;
use merchflow_shared::NotificationEvent;
use std::sync::Mutex;
use uuid::Uuid;

/// Fire-and-forget notification sink. Delivery failures are the
/// implementation's problem; the engine never blocks on or reads back
/// a notification, so the trait is infallible by contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, party_id: Uuid, event: NotificationEvent);
}

/// Discards every event.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _party_id: Uuid, _event: NotificationEvent) {}
}

/// Records events for test assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(Uuid, NotificationEvent)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, party_id: Uuid, event: NotificationEvent) {
        // Lock poisoning only happens if a test already panicked.
        if let Ok(mut events) = self.events.lock() {
            events.push((party_id, event));
        }
    }
}
