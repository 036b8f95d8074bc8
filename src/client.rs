//! Client wiring: one manager task, one queue, one bus.
//!
//! `MonitorClient` is the explicit context object. Build it, subscribe to
//! its bus, then spawn it; everything else talks to it through a
//! [`ClientHandle`].

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::events::{ManagerEvent, MonitorEvent};
use crate::protocol::types::ClientRequest;
use crate::services::connection::ConnectionManager;
use crate::services::transport::Transport;

pub struct MonitorClient {
    manager: ConnectionManager,
    queue: mpsc::UnboundedReceiver<ManagerEvent>,
    handle: ClientHandle,
}

impl MonitorClient {
    pub fn new(config: &AppConfig, transport: Box<dyn Transport>) -> Self {
        let bus = EventBus::new(config.event_bus_capacity);
        let (tx, queue) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(
            config.ws_url.clone(),
            config.retry_interval(),
            transport,
            bus.clone(),
            tx.clone(),
        );

        Self {
            manager,
            queue,
            handle: ClientHandle::from_parts(tx, bus),
        }
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Connects immediately and runs until [`ClientHandle::shutdown`].
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.manager.run(self.queue))
    }
}

#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<ManagerEvent>,
    bus: EventBus,
}

impl ClientHandle {
    pub fn from_parts(tx: mpsc::UnboundedSender<ManagerEvent>, bus: EventBus) -> Self {
        Self { tx, bus }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Host became active again; reconnect now if disconnected.
    pub fn wake(&self) -> MonitorResult<()> {
        self.post(ManagerEvent::Wake)
    }

    pub fn ping(&self) -> MonitorResult<()> {
        self.post(ManagerEvent::Send(ClientRequest::Ping))
    }

    /// Ask the backend for a full `system_update`.
    pub fn request_status(&self) -> MonitorResult<()> {
        self.post(ManagerEvent::Send(ClientRequest::GetStatus))
    }

    pub fn shutdown(&self) -> MonitorResult<()> {
        self.post(ManagerEvent::Shutdown)
    }

    fn post(&self, event: ManagerEvent) -> MonitorResult<()> {
        self.tx.send(event).map_err(|_| MonitorError::ClientClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_posts_events_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ClientHandle::from_parts(tx, EventBus::new(4));

        handle.wake().unwrap();
        handle.request_status().unwrap();
        handle.ping().unwrap();
        handle.shutdown().unwrap();

        assert_eq!(rx.recv().await, Some(ManagerEvent::Wake));
        assert_eq!(
            rx.recv().await,
            Some(ManagerEvent::Send(ClientRequest::GetStatus))
        );
        assert_eq!(rx.recv().await, Some(ManagerEvent::Send(ClientRequest::Ping)));
        assert_eq!(rx.recv().await, Some(ManagerEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_handle_after_manager_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ClientHandle::from_parts(tx, EventBus::new(4));
        drop(rx);

        assert!(matches!(handle.wake(), Err(MonitorError::ClientClosed)));
    }
}
