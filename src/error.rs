//! Error types for the monitoring client
//!
//! Every runtime kind is terminal where it is detected: transport errors
//! feed the retry policy, decode errors drop the frame, application errors
//! are reported and nothing more.

use thiserror::Error;

/// Top-level client errors
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Server reported error: {message}")]
    Application { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client is shut down")]
    ClientClosed,
}

/// Connect failures, unexpected closes, socket-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid endpoint {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Connection closed: {0}")]
    Closed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Socket(err.to_string())
    }
}

/// Inbound frame did not match the wire schema
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame has no string `type` field")]
    MissingType,

    #[error("Invalid `{tag}` payload: {source}")]
    Schema {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

/// config.yaml / environment problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type MonitorResult<T> = Result<T, MonitorError>;
