//! Read-side view of the client for the API and the console sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::data::store::SystemSnapshot;
use crate::events::{ConnectionState, MonitorEvent};

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub connection: ConnectionState,
    pub snapshot: Arc<SystemSnapshot>,
    pub server_errors: u64,
    pub last_server_error: Option<String>,
}

impl ViewState {
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot.last_update
    }
}

/// Latest connection state and snapshot, fed from the event bus.
#[derive(Clone, Default)]
pub struct SnapshotView {
    inner: Arc<RwLock<ViewState>>,
}

impl SnapshotView {
    pub async fn apply(&self, event: &MonitorEvent) {
        let mut state = self.inner.write().await;
        match event {
            MonitorEvent::ConnectionStatus(connection) => state.connection = *connection,
            MonitorEvent::SnapshotChanged(snapshot) => {
                if snapshot.revision >= state.snapshot.revision {
                    state.snapshot = Arc::clone(snapshot);
                }
            }
            MonitorEvent::ServerError(message) => {
                state.server_errors += 1;
                state.last_server_error = Some(message.clone());
            }
        }
    }

    /// Overwrite connection and snapshot with the bus's latest values.
    pub async fn resync(&self, connection: ConnectionState, snapshot: Arc<SystemSnapshot>) {
        let mut state = self.inner.write().await;
        state.connection = connection;
        if snapshot.revision >= state.snapshot.revision {
            state.snapshot = snapshot;
        }
    }

    pub async fn state(&self) -> ViewState {
        self.inner.read().await.clone()
    }

    /// Follow the bus until it closes, logging a one-line summary per change.
    /// After a lag the view resyncs from the bus's latest state.
    pub fn attach(&self, bus: &EventBus) -> JoinHandle<()> {
        let view = self.clone();
        let mut events = bus.subscribe();
        let latest_connection = bus.watch_connection();
        let latest_snapshot = bus.watch_snapshot();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        match &event {
                            MonitorEvent::ConnectionStatus(state) => {
                                info!("📶 Connection: {}", state)
                            }
                            MonitorEvent::SnapshotChanged(snapshot) => {
                                info!("📊 {}", summary(snapshot))
                            }
                            MonitorEvent::ServerError(_) => {}
                        }
                        view.apply(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("⚠ View lagged, skipped {} events, resyncing", skipped);
                        let snapshot = Arc::clone(&latest_snapshot.borrow());
                        let connection = *latest_connection.borrow();
                        view.resync(connection, snapshot).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

pub fn summary(snapshot: &SystemSnapshot) -> String {
    let mut parts: Vec<String> = snapshot
        .market_data
        .iter()
        .map(|(symbol, quote)| format!("{} {:.2} ({:+.2}%)", symbol, quote.price, quote.change_percent))
        .collect();

    parts.push(format!("signals={}", snapshot.trading_signals.len()));
    parts.push(format!("positions={}", snapshot.positions.len()));
    if let Some(account) = &snapshot.account {
        parts.push(format!("pnl={:+.2}", account.pnl));
    }

    format!("rev {} | {}", snapshot.revision, parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::MarketQuote;

    #[tokio::test]
    async fn test_view_tracks_events() {
        let view = SnapshotView::default();
        assert_eq!(view.state().await.connection, ConnectionState::Disconnected);

        view.apply(&MonitorEvent::ConnectionStatus(ConnectionState::Connected))
            .await;
        let snapshot = Arc::new(SystemSnapshot {
            revision: 4,
            ..Default::default()
        });
        view.apply(&MonitorEvent::SnapshotChanged(snapshot.clone()))
            .await;
        view.apply(&MonitorEvent::ServerError("boom".to_string()))
            .await;

        let state = view.state().await;
        assert_eq!(state.connection, ConnectionState::Connected);
        assert_eq!(state.snapshot.revision, 4);
        assert_eq!(state.server_errors, 1);
        assert_eq!(state.last_server_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_attach_follows_bus_until_closed() {
        let bus = EventBus::new(16);
        let view = SnapshotView::default();
        let task = view.attach(&bus);

        bus.publish(MonitorEvent::ConnectionStatus(ConnectionState::Connecting))
            .unwrap();
        drop(bus);
        task.await.unwrap();

        assert_eq!(view.state().await.connection, ConnectionState::Connecting);
    }

    #[test]
    fn test_summary() {
        let mut snapshot = SystemSnapshot {
            revision: 2,
            ..Default::default()
        };
        snapshot.market_data.insert(
            "SPX".to_string(),
            MarketQuote {
                price: 4500.25,
                change_percent: 0.28,
                ..Default::default()
            },
        );

        assert_eq!(
            summary(&snapshot),
            "rev 2 | SPX 4500.25 (+0.28%) | signals=0 | positions=0"
        );
    }

    #[tokio::test]
    async fn test_attach_resyncs_after_lag() {
        let bus = EventBus::new(2);
        let view = SnapshotView::default();
        // Current-thread runtime: the view task cannot run until the test yields
        let task = view.attach(&bus);

        bus.publish(MonitorEvent::ConnectionStatus(ConnectionState::Connecting))
            .unwrap();
        bus.publish(MonitorEvent::ConnectionStatus(ConnectionState::Connected))
            .unwrap();
        bus.publish(MonitorEvent::SnapshotChanged(Arc::new(SystemSnapshot {
            revision: 3,
            ..Default::default()
        })))
        .unwrap();
        bus.publish(MonitorEvent::ServerError("one".to_string()))
            .unwrap();
        bus.publish(MonitorEvent::ServerError("two".to_string()))
            .unwrap();
        drop(bus);
        task.await.unwrap();

        let state = view.state().await;
        assert_eq!(state.connection, ConnectionState::Connected);
        assert_eq!(state.snapshot.revision, 3);
        assert_eq!(state.server_errors, 2);
        assert_eq!(state.last_server_error.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_older_snapshot_does_not_replace_newer() {
        let view = SnapshotView::default();
        view.resync(
            ConnectionState::Connected,
            Arc::new(SystemSnapshot {
                revision: 5,
                ..Default::default()
            }),
        )
        .await;
        view.apply(&MonitorEvent::SnapshotChanged(Arc::new(SystemSnapshot {
            revision: 4,
            ..Default::default()
        })))
        .await;

        assert_eq!(view.state().await.snapshot.revision, 5);
    }
}
