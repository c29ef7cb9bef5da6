//! # Change Notifier
//!
//! Publishes "this entity changed" events after successful writes, so a UI
//! layer can decide when to re-fetch orders, products or clients.
//!
//! ```text
//! command ──commit──► Notifier::publish(ChangeEvent) ──► broadcast channel
//!                                                          ├─► subscriber A
//!                                                          └─► subscriber B
//! ```
//!
//! Publishing with no subscribers is not an error.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// What kind of entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    Product,
    Client,
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub entity: EntityKind,
    pub id: String,
}

impl ChangeEvent {
    pub fn order(id: impl Into<String>) -> Self {
        ChangeEvent {
            entity: EntityKind::Order,
            id: id.into(),
        }
    }

    pub fn product(id: impl Into<String>) -> Self {
        ChangeEvent {
            entity: EntityKind::Product,
            id: id.into(),
        }
    }

    pub fn client(id: impl Into<String>) -> Self {
        ChangeEvent {
            entity: EntityKind::Client,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Notifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ChangeEvent) {
        debug!(entity = ?event.entity, id = %event.id, "Publishing change");
        let _ = self.tx.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.publish_all([ChangeEvent::order("o1"), ChangeEvent::product("p1")]);

        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::order("o1"));
        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::product("p1"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let notifier = Notifier::new(0);
        notifier.publish(ChangeEvent::client("c1"));
    }
}
