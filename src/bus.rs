use crate::data::store::SystemSnapshot;
use crate::events::{ConnectionState, MonitorEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Broadcast notifications plus the latest value of each state-carrying event,
/// so a lagged subscriber can resync.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
    connection: Arc<watch::Sender<ConnectionState>>,
    snapshot: Arc<watch::Sender<Arc<SystemSnapshot>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        let (connection, _) = watch::channel(ConnectionState::default());
        let (snapshot, _) = watch::channel(Arc::new(SystemSnapshot::default()));
        Self {
            tx,
            connection: Arc::new(connection),
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: MonitorEvent) -> Result<usize, broadcast::error::SendError<MonitorEvent>> {
        match &event {
            MonitorEvent::ConnectionStatus(state) => {
                self.connection.send_replace(*state);
            }
            MonitorEvent::SnapshotChanged(snapshot) => {
                self.snapshot.send_replace(Arc::clone(snapshot));
            }
            MonitorEvent::ServerError(_) => {}
        }
        self.tx.send(event)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn latest_snapshot(&self) -> Arc<SystemSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Watch the connection state without keeping the broadcast side open.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<SystemSnapshot>> {
        self.snapshot.subscribe()
    }
}
