//! Side channel for messages that must reach one user outside the inline
//! result list.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::UserId;
use crate::domain::events::NotificationEvent;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort: delivery problems are logged, never surfaced.
    async fn notify(&self, user_id: UserId, message: String);
}

/// Publishes [`NotificationEvent::UserNotice`] on the application event bus,
/// where the SSE endpoint picks it up for the transport adapter.
#[derive(Clone)]
pub struct EventBusNotifier {
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl EventBusNotifier {
    #[must_use]
    pub const fn new(event_bus: broadcast::Sender<NotificationEvent>) -> Self {
        Self { event_bus }
    }
}

#[async_trait::async_trait]
impl Notifier for EventBusNotifier {
    async fn notify(&self, user_id: UserId, message: String) {
        let event = NotificationEvent::UserNotice { user_id, message };
        match self.event_bus.send(event) {
            Ok(receivers) => debug!(user_id = %user_id, receivers, "User notice published"),
            Err(_) => warn!(
                user_id = %user_id,
                "User notice dropped: no transport is subscribed to the event stream"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_user_notice() {
        let (tx, mut rx) = broadcast::channel(4);
        let notifier = EventBusNotifier::new(tx);

        notifier.notify(UserId::new(3), "boom".to_string()).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            NotificationEvent::UserNotice {
                user_id: UserId::new(3),
                message: "boom".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_subscribers_is_not_an_error() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        EventBusNotifier::new(tx)
            .notify(UserId::new(1), "nobody listens".to_string())
            .await;
    }
}
