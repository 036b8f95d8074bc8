use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::data::store::SystemSnapshot;
use crate::error::TransportError;
use crate::protocol::types::ClientRequest;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Identity of one transport handle. Events carrying an older id are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    Closed { reason: Option<String> },
    Failed(TransportError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransportEvent {
    pub id: ConnectionId,
    pub kind: TransportEventKind,
}

/// Everything the connection manager reacts to, in arrival order
#[derive(Clone, Debug, PartialEq)]
pub enum ManagerEvent {
    Transport(TransportEvent),
    RetryTick,
    Wake,
    Send(ClientRequest),
    Shutdown,
}

// Global Event Enum published to the rendering side
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    ConnectionStatus(ConnectionState),
    SnapshotChanged(Arc<SystemSnapshot>),
    ServerError(String),
}
