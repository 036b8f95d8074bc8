//! Trading Monitor - real-time client for an AI trading backend
//!
//! Keeps a streaming connection alive with a fixed-cadence retry policy,
//! decodes the tagged message protocol and maintains an in-memory system
//! snapshot that partial updates are merged into.

pub mod api;
pub mod bus;
pub mod client;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod events;
pub mod protocol;
pub mod services;

// Re-export commonly used types
pub use bus::EventBus;
pub use client::{ClientHandle, MonitorClient};
pub use config::AppConfig;
pub use data::store::SystemSnapshot;
pub use error::MonitorError;
pub use events::{ConnectionState, MonitorEvent};
pub use services::transport::WsTransport;
