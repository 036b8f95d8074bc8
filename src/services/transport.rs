//! Streaming transport seam.
//!
//! A transport turns socket activity into [`TransportEvent`]s posted on the
//! manager's queue, tagged with the handle id they belong to. It never
//! touches client state itself.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info};

use crate::config::validate_ws_url;
use crate::error::TransportError;
use crate::events::{ConnectionId, ManagerEvent, TransportEvent, TransportEventKind};

pub trait Transport: Send {
    /// Start a connection attempt. An `Err` here is a construction failure;
    /// everything after that arrives as events.
    fn open(
        &self,
        url: &str,
        id: ConnectionId,
        events: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Result<TransportHandle, TransportError>;
}

/// The one live connection. Dropping it tears the socket task down.
pub struct TransportHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn new(
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self { id, outbound, task }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Closed(format!("connection {} is gone", self.id)))
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// WebSocket transport over tokio-tungstenite
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(
        &self,
        url: &str,
        id: ConnectionId,
        events: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Result<TransportHandle, TransportError> {
        let url = validate_ws_url(url).map_err(|reason| TransportError::InvalidUrl {
            url: url.to_string(),
            reason,
        })?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url.to_string(), id, events, outbound_rx));
        Ok(TransportHandle::new(id, outbound_tx, Some(task)))
    }
}

fn post(events: &mpsc::UnboundedSender<ManagerEvent>, id: ConnectionId, kind: TransportEventKind) {
    // Manager gone means we are shutting down
    let _ = events.send(ManagerEvent::Transport(TransportEvent { id, kind }));
}

async fn run_socket(
    url: String,
    id: ConnectionId,
    events: mpsc::UnboundedSender<ManagerEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    info!("🔌 Connecting to WebSocket {} ({})", url, id);

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            post(&events, id, TransportEventKind::Failed(TransportError::Connect(e.to_string())));
            return;
        }
    };
    post(&events, id, TransportEventKind::Opened);

    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => post(&events, id, TransportEventKind::Frame(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    // Not expected on this protocol; let the codec reject it if it is garbage
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    post(&events, id, TransportEventKind::Frame(text));
                }
                Some(Ok(Message::Ping(payload))) => {
                    write.send(Message::Pong(payload)).await.ok();
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                    post(&events, id, TransportEventKind::Closed { reason });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    post(&events, id, TransportEventKind::Failed(e.into()));
                    break;
                }
                None => {
                    post(&events, id, TransportEventKind::Closed { reason: None });
                    break;
                }
            },
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        post(&events, id, TransportEventKind::Failed(e.into()));
                        break;
                    }
                }
                None => {
                    debug!("Handle {} released, closing socket", id);
                    write.close().await.ok();
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_construction_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = WsTransport.open("http://localhost:8765", ConnectionId(1), tx);

        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refused_connection_posts_failed() {
        // Grab a free port, then release it so nothing listens there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WsTransport
            .open(&format!("ws://127.0.0.1:{}", port), ConnectionId(7), tx)
            .unwrap();
        assert_eq!(handle.id(), ConnectionId(7));

        match rx.recv().await.unwrap() {
            ManagerEvent::Transport(TransportEvent { id, kind }) => {
                assert_eq!(id, ConnectionId(7));
                assert!(matches!(kind, TransportEventKind::Failed(TransportError::Connect(_))));
            }
            other => panic!("Expected transport event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_after_task_gone_fails() {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let handle = TransportHandle::new(ConnectionId(3), outbound_tx, None);
        drop(outbound_rx);

        assert!(matches!(
            handle.send("{}".to_string()),
            Err(TransportError::Closed(_))
        ));
    }
}
