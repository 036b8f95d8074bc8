//! Connection lifecycle state machine.
//!
//! The manager drains one queue of [`ManagerEvent`]s and handles each to
//! completion before the next: transport callbacks, retry ticks, wake
//! requests and outbound sends all arrive here. Only events whose
//! [`ConnectionId`] matches the live handle are honored.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::constants::log_events;
use crate::data::store::SystemSnapshot;
use crate::error::TransportError;
use crate::events::{
    ConnectionId, ConnectionState, ManagerEvent, MonitorEvent, TransportEvent, TransportEventKind,
};
use crate::protocol::codec::{decode, encode_request};
use crate::protocol::types::ClientRequest;

use super::dispatch::DispatchRouter;
use super::retry::RetryTimer;
use super::transport::{Transport, TransportHandle};

pub struct ConnectionManager {
    url: String,
    state: ConnectionState,
    transport: Box<dyn Transport>,
    current: Option<TransportHandle>,
    next_id: u64,
    connect_attempts: u64,
    retry: RetryTimer,
    router: DispatchRouter,
    bus: EventBus,
    events: mpsc::UnboundedSender<ManagerEvent>,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        retry_interval: Duration,
        transport: Box<dyn Transport>,
        bus: EventBus,
        events: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            state: ConnectionState::Disconnected,
            transport,
            current: None,
            next_id: 0,
            connect_attempts: 0,
            retry: RetryTimer::new(retry_interval, events.clone()),
            router: DispatchRouter::new(bus.clone()),
            bus,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn snapshot(&self) -> Arc<SystemSnapshot> {
        self.router.snapshot()
    }

    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current.as_ref().map(TransportHandle::id)
    }

    pub fn retry_timer(&self) -> &RetryTimer {
        &self.retry
    }

    /// First attempt plus the retry timer, which runs until a connection opens.
    pub fn start(&mut self) {
        self.connect();
        self.retry.arm();
    }

    /// Open a new transport, superseding any attempt still in flight.
    pub fn connect(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!("Superseding connection {}", previous.id());
        }

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.connect_attempts += 1;
        self.set_state(ConnectionState::Connecting);
        info!(
            event = log_events::CONNECT_ATTEMPT,
            connection = %id,
            "🔌 Connecting to {}",
            self.url
        );

        match self.transport.open(&self.url, id, self.events.clone()) {
            Ok(handle) => self.current = Some(handle),
            // Construction failure is handled exactly like a close
            Err(e) => self.on_disconnect(e),
        }
    }

    pub fn handle_event(&mut self, event: ManagerEvent) -> ControlFlow<()> {
        match event {
            ManagerEvent::Transport(event) => self.on_transport(event),
            ManagerEvent::RetryTick => self.on_retry_tick(),
            ManagerEvent::Wake => self.on_wake(),
            ManagerEvent::Send(request) => self.on_send(request),
            ManagerEvent::Shutdown => {
                self.retry.cancel();
                self.current = None;
                self.set_state(ConnectionState::Disconnected);
                info!("🛑 Connection manager stopped");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ManagerEvent>) {
        self.start();
        while let Some(event) = events.recv().await {
            if self.handle_event(event).is_break() {
                break;
            }
        }
    }

    fn on_transport(&mut self, event: TransportEvent) {
        if self.current_id() != Some(event.id) {
            debug!(
                event = log_events::STALE_TRANSPORT_EVENT,
                connection = %event.id,
                "Ignoring event from replaced connection"
            );
            return;
        }

        match event.kind {
            TransportEventKind::Opened => self.on_open(),
            TransportEventKind::Frame(text) => self.on_frame(&text),
            TransportEventKind::Closed { reason } => {
                let reason = reason.unwrap_or_else(|| "closed by peer".to_string());
                self.on_disconnect(TransportError::Closed(reason));
            }
            TransportEventKind::Failed(e) => self.on_disconnect(e),
        }
    }

    fn on_open(&mut self) {
        self.set_state(ConnectionState::Connected);
        self.retry.cancel();
        info!(event = log_events::CONNECTED, "✅ WebSocket connected");
    }

    fn on_frame(&mut self, text: &str) {
        match decode(text) {
            Ok(message) => {
                self.router.dispatch(message);
            }
            Err(e) => {
                warn!(
                    event = log_events::DECODE_FAILED,
                    error = %e,
                    "⚠ Failed to parse message, discarding"
                );
            }
        }
    }

    fn on_disconnect(&mut self, reason: TransportError) {
        self.current = None;
        self.set_state(ConnectionState::Disconnected);
        match &reason {
            TransportError::Closed(_) => {
                warn!(event = log_events::DISCONNECTED, reason = %reason, "❌ WebSocket disconnected")
            }
            _ => error!(event = log_events::TRANSPORT_ERROR, error = %reason, "❌ WebSocket error"),
        }
        self.retry.arm();
    }

    fn on_retry_tick(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        info!(event = log_events::RETRY_TICK, "🔄 Reconnection attempt...");
        self.connect();
    }

    fn on_wake(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {
                info!(event = log_events::WAKE, "👁️ Wake signal - reconnecting");
                self.connect();
            }
            // An attempt is already in flight or live; the retry timer owns superseding
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(event = log_events::WAKE, state = %self.state, "Wake ignored");
            }
        }
    }

    fn on_send(&mut self, request: ClientRequest) {
        let handle = match (&self.current, self.state) {
            (Some(handle), ConnectionState::Connected) => handle,
            _ => {
                warn!(
                    event = log_events::REQUEST_DROPPED,
                    request = ?request,
                    state = %self.state,
                    "⚠ Not connected, request dropped"
                );
                return;
            }
        };

        if let Err(e) = handle.send(encode_request(&request)) {
            warn!(event = log_events::REQUEST_DROPPED, error = %e, "⚠ Send failed");
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        debug!("Connection state: {} -> {}", self.state, next);
        self.state = next;
        let _ = self.bus.publish(MonitorEvent::ConnectionStatus(next));
    }
}
