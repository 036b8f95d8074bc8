use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::constants::log_events;
use crate::data::store::{SnapshotStore, SystemSnapshot};
use crate::error::MonitorError;
use crate::events::MonitorEvent;
use crate::protocol::types::Message;

/// What the router did with a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Acknowledged,
    Applied { revision: u64 },
    ServerError,
    Pong,
    Unhandled,
}

/// Routes decoded messages by tag. The only writer of the snapshot store.
pub struct DispatchRouter {
    store: SnapshotStore,
    bus: EventBus,
}

impl DispatchRouter {
    pub fn new(bus: EventBus) -> Self {
        Self {
            store: SnapshotStore::new(bus.clone()),
            bus,
        }
    }

    pub fn snapshot(&self) -> Arc<SystemSnapshot> {
        self.store.snapshot()
    }

    pub fn dispatch(&mut self, message: Message) -> DispatchOutcome {
        self.dispatch_at(message, Utc::now())
    }

    pub fn dispatch_at(&mut self, message: Message, received_at: DateTime<Utc>) -> DispatchOutcome {
        debug!("📨 Message received: {}", message.tag());

        match message {
            Message::Welcome(welcome) => {
                info!(
                    version = welcome.version.as_deref().unwrap_or("unknown"),
                    "🎉 Welcome: {}",
                    welcome.message
                );
                DispatchOutcome::Acknowledged
            }
            Message::SystemUpdate(update) => {
                let snapshot = self.store.merge(*update, received_at);
                debug!(
                    event = log_events::SNAPSHOT_APPLIED,
                    revision = snapshot.revision,
                    "📊 System update applied"
                );
                DispatchOutcome::Applied {
                    revision: snapshot.revision,
                }
            }
            Message::Error(server_error) => {
                let err = MonitorError::Application {
                    message: server_error.message.clone(),
                };
                error!(event = log_events::SERVER_ERROR, "❌ {}", err);
                let _ = self
                    .bus
                    .publish(MonitorEvent::ServerError(server_error.message));
                DispatchOutcome::ServerError
            }
            Message::Pong(pong) => {
                debug!("🏓 Pong ({})", pong.timestamp.as_deref().unwrap_or("-"));
                DispatchOutcome::Pong
            }
            Message::Unknown { tag, payload } => {
                warn!(
                    event = log_events::UNHANDLED_MESSAGE,
                    tag = %tag,
                    "📨 Unhandled message: {}",
                    payload
                );
                DispatchOutcome::Unhandled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::decode;
    use crate::protocol::types::{ServerError, SystemUpdate, Welcome};
    use serde_json::json;

    #[test]
    fn test_welcome_is_side_effect_free() {
        let mut router = DispatchRouter::new(EventBus::new(16));
        let before = router.snapshot();

        let outcome = router.dispatch(Message::Welcome(Welcome {
            message: "hello".to_string(),
            ..Default::default()
        }));

        assert_eq!(outcome, DispatchOutcome::Acknowledged);
        assert!(Arc::ptr_eq(&before, &router.snapshot()));
    }

    #[test]
    fn test_system_update_applies_and_stamps() {
        let mut router = DispatchRouter::new(EventBus::new(16));

        let msg = decode(r#"{"type":"system_update","market_data":{"SPX":{"price":4500.25,"change":12.5,"change_percent":0.28,"volume":2300000}}}"#).unwrap();
        let outcome = router.dispatch(msg);

        assert_eq!(outcome, DispatchOutcome::Applied { revision: 1 });
        let snapshot = router.snapshot();
        assert_eq!(snapshot.market_data["SPX"].price, 4500.25);
        assert!(snapshot.last_update.is_some());
        assert!(snapshot.ai_levels.is_empty());
        assert!(snapshot.trading_signals.is_empty());
    }

    #[test]
    fn test_every_update_advances_revision() {
        let mut router = DispatchRouter::new(EventBus::new(16));

        for expected in 1..=3 {
            let outcome = router.dispatch(Message::SystemUpdate(Box::new(SystemUpdate::default())));
            assert_eq!(outcome, DispatchOutcome::Applied { revision: expected });
        }
    }

    #[tokio::test]
    async fn test_server_error_is_reported_not_applied() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut router = DispatchRouter::new(bus);

        let outcome = router.dispatch(Message::Error(ServerError {
            message: "Invalid JSON format".to_string(),
            timestamp: None,
        }));

        assert_eq!(outcome, DispatchOutcome::ServerError);
        assert!(router.snapshot().is_empty());
        match rx.recv().await.unwrap() {
            MonitorEvent::ServerError(message) => assert_eq!(message, "Invalid JSON format"),
            other => panic!("Expected ServerError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_changes_nothing() {
        let mut router = DispatchRouter::new(EventBus::new(16));

        let outcome = router.dispatch(Message::Unknown {
            tag: "heartbeat".to_string(),
            payload: json!({"type": "heartbeat"}),
        });

        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert!(router.snapshot().is_empty());
    }
}
