use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// An application was installed (or reinstalled over an existing key).
pub const APPS_INSTALLED: &str = "apps.installed";
/// The user declined an install prompt.
pub const APPS_INSTALL_DENIED: &str = "apps.install.denied";
/// An installation was removed on request.
pub const APPS_REMOVED: &str = "apps.removed";
/// A stored installation failed to load and was pruned.
pub const APPS_PURGED: &str = "apps.purged";

/// Receiving half handed to subscribers.
pub type Receiver = broadcast::Receiver<Envelope>;

/// Minimal event envelope (RFC3339 time).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Envelope {
    pub time: String,
    pub kind: String,
    pub payload: Value,
}

/// A simple broadcast bus for JSON-serializable registry events.
///
/// Publishing never blocks and never fails; with no subscribers the event is
/// dropped.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Envelope>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> Receiver {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish<T: Serialize>(&self, kind: &str, payload: &T) {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let val = serde_json::to_value(payload).unwrap_or_else(|err| {
            tracing::debug!(
                target: "apprepo::events",
                %kind,
                error = %err,
                "event payload failed to serialize"
            );
            serde_json::json!({"_ser":"error"})
        });
        let _ = self.tx.send(Envelope {
            time: now,
            kind: kind.to_string(),
            payload: val,
        });
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_envelopes() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(APPS_REMOVED, &json!({"id": "http://a.com"}));

        let env = rx.recv().await.expect("event delivered");
        assert_eq!(env.kind, APPS_REMOVED);
        assert_eq!(env.payload["id"], "http://a.com");
        assert!(chrono::DateTime::parse_from_rfc3339(&env.time).is_ok());
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let bus = Bus::default();
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(APPS_PURGED, &json!({"id": "x"}));
    }
}
