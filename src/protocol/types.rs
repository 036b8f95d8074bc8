//! Wire types for the monitoring protocol.
//!
//! Every frame is a JSON object tagged by `type`. Payload groups that the
//! server may omit are `Option`s so absence is a value, not a lookup miss.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::tags;

/// Trade direction shared by signals and positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// One decoded inbound frame
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Welcome(Welcome),
    SystemUpdate(Box<SystemUpdate>),
    Error(ServerError),
    Pong(Pong),
    /// Tag we do not handle; the whole object is kept as-is
    Unknown { tag: String, payload: Value },
}

impl Message {
    pub fn tag(&self) -> &str {
        match self {
            Message::Welcome(_) => tags::WELCOME,
            Message::SystemUpdate(_) => tags::SYSTEM_UPDATE,
            Message::Error(_) => tags::ERROR,
            Message::Pong(_) => tags::PONG,
            Message::Unknown { tag, .. } => tag.as_str(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub server_time: Option<String>,
    #[serde(default)]
    pub system_status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Partial system state. Each `None` group leaves the snapshot untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemUpdate {
    #[serde(default)]
    pub market_data: Option<BTreeMap<String, MarketQuote>>,
    #[serde(default)]
    pub ai_levels: Option<BTreeMap<String, SymbolLevels>>,
    #[serde(default)]
    pub trading_signals: Option<Vec<Signal>>,
    #[serde(default)]
    pub mt5_status: Option<BrokerStatus>,
    #[serde(default)]
    pub system_health: Option<SystemHealth>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, rename = "vix")]
    pub volatility_index: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A support or resistance estimate. Confidence is taken as sent, no clamping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub confidence: f64,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolLevels {
    #[serde(default)]
    pub supports: Vec<Level>,
    #[serde(default)]
    pub resistances: Vec<Level>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub side: Side,
    pub symbol: String,
    pub confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `mt5_status` group. `account` and `positions` are applied independently.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerStatus {
    #[serde(default)]
    pub connected: Option<bool>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub positions: Option<Vec<Position>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "login_as_string")]
    pub login: Option<String>,
    pub balance: f64,
    pub equity: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub free_margin: Option<f64>,
}

impl Account {
    pub fn pnl(&self) -> f64 {
        self.equity - self.balance
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub ticket: Option<u64>,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: Side,
    pub volume: f64,
    pub price_open: f64,
    pub price_current: f64,
    pub profit: f64,
    #[serde(default)]
    pub swap: Option<f64>,
    #[serde(default)]
    pub commission: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Backend health figures. Uptime and usage arrive preformatted ("99.9%").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<String>,
    #[serde(default)]
    pub cpu_usage: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub clients_connected: Option<u32>,
}

/// Frames the client may send
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    Ping,
    GetStatus,
}

// Brokers report the login as a number; some bridges send it as a string.
fn login_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "login must be a number or string, got {}",
            other
        ))),
    }
}
