//! Application-wide constants
//!
//! Centralizes the defaults and the structured log event names so the
//! connection engine and its diagnostics stay in one place.

use std::time::Duration;

/// Connection and retry defaults
pub mod connection {
    use super::*;

    /// Streaming endpoint used when neither config.yaml nor the environment set one
    pub const DEFAULT_WS_URL: &str = "ws://localhost:8765";

    /// Fixed retry cadence. Not exponential, no attempt cap.
    pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    /// Broadcast capacity for monitor events; slow subscribers lag instead of blocking
    pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;
}

/// Status API defaults
pub mod api {
    pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
    pub const SERVICE_NAME: &str = "Trading Monitor Client";
}

/// Wire protocol tags
pub mod tags {
    pub const WELCOME: &str = "welcome";
    pub const SYSTEM_UPDATE: &str = "system_update";
    pub const ERROR: &str = "error";
    pub const PONG: &str = "pong";
}

/// Logging event names for structured logging
pub mod log_events {
    pub const CONNECT_ATTEMPT: &str = "connect_attempt";
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const TRANSPORT_ERROR: &str = "transport_error";
    pub const DECODE_FAILED: &str = "decode_failed";
    pub const UNHANDLED_MESSAGE: &str = "unhandled_message";
    pub const SERVER_ERROR: &str = "server_error";
    pub const STALE_TRANSPORT_EVENT: &str = "stale_transport_event";
    pub const RETRY_TICK: &str = "retry_tick";
    pub const WAKE: &str = "wake";
    pub const SNAPSHOT_APPLIED: &str = "snapshot_applied";
    pub const REQUEST_DROPPED: &str = "request_dropped";
}
