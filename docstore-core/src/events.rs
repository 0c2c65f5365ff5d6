use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::Permission;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Granted {
        document_id: Uuid,
        user_id: Uuid,
        level: Permission,
    },
    Revoked {
        document_id: Uuid,
        user_id: Uuid,
    },
    LinkCreated {
        document_id: Uuid,
        share_id: Uuid,
    },
    LinkDeleted {
        document_id: Uuid,
        share_id: Uuid,
    },
    LinkRedeemed {
        share_id: Uuid,
    },
}

/// Broadcast bus for host applications that want to index or audit
/// access-control changes. Sending never fails an operation: a missing or
/// lagging subscriber is ignored.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let document_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let event = Event::Granted {
            document_id,
            user_id,
            level: Permission::Edit,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Granted");
        assert_eq!(json["level"], "Edit");
        assert_eq!(json["document_id"], document_id.to_string());
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers_and_tolerates_having_none() {
        let bus = EventBus::new();
        // no subscriber yet; must not fail
        bus.send(Event::LinkRedeemed {
            share_id: Uuid::new_v4(),
        });

        let mut rx = bus.subscribe();
        let share_id = Uuid::new_v4();
        bus.send(Event::LinkRedeemed { share_id });
        match rx.recv().await.unwrap() {
            Event::LinkRedeemed { share_id: got } => assert_eq!(got, share_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
