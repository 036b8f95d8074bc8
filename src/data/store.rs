//! In-memory system snapshot with group-level partial merge.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bus::EventBus;
use crate::events::MonitorEvent;
use crate::protocol::types::{
    Account, MarketQuote, Position, Signal, SymbolLevels, SystemHealth, SystemUpdate,
};

/// Account balances plus the derived P&L, recomputed on every account merge
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub login: Option<String>,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: Option<f64>,
    pub pnl: f64,
}

impl From<Account> for AccountSnapshot {
    fn from(account: Account) -> Self {
        let pnl = account.pnl();
        Self {
            login: account.login,
            balance: account.balance,
            equity: account.equity,
            margin: account.margin,
            free_margin: account.free_margin,
            pnl,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub market_data: BTreeMap<String, MarketQuote>,
    pub ai_levels: BTreeMap<String, SymbolLevels>,
    pub trading_signals: Vec<Signal>,
    pub account: Option<AccountSnapshot>,
    pub positions: Vec<Position>,
    pub broker_connected: Option<bool>,
    pub broker_server: Option<String>,
    pub health: Option<SystemHealth>,
    pub last_update: Option<DateTime<Utc>>,
    /// Number of system updates applied so far
    pub revision: u64,
}

impl SystemSnapshot {
    pub fn is_empty(&self) -> bool {
        self.revision == 0
    }
}

/// Single-writer owner of the current [`SystemSnapshot`].
///
/// Readers get `Arc` clones; a merge copies on write, so a reader holding
/// an earlier `Arc` never sees a half-applied update.
pub struct SnapshotStore {
    current: Arc<SystemSnapshot>,
    bus: EventBus,
}

impl SnapshotStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            current: Arc::new(SystemSnapshot::default()),
            bus,
        }
    }

    pub fn snapshot(&self) -> Arc<SystemSnapshot> {
        Arc::clone(&self.current)
    }

    /// Apply every group present in `update`, stamp the snapshot and notify.
    ///
    /// Groups are replaced wholesale; signals and positions are never
    /// element-merged. `received_at` is bumped past the previous stamp if the
    /// clock did not move forward.
    pub fn merge(&mut self, update: SystemUpdate, received_at: DateTime<Utc>) -> Arc<SystemSnapshot> {
        let snapshot = Arc::make_mut(&mut self.current);

        if let Some(market_data) = update.market_data {
            snapshot.market_data = market_data;
        }
        if let Some(ai_levels) = update.ai_levels {
            snapshot.ai_levels = ai_levels;
        }
        if let Some(signals) = update.trading_signals {
            snapshot.trading_signals = signals;
        }
        if let Some(broker) = update.mt5_status {
            if let Some(account) = broker.account {
                snapshot.account = Some(account.into());
            }
            if let Some(positions) = broker.positions {
                snapshot.positions = positions;
            }
            if broker.connected.is_some() {
                snapshot.broker_connected = broker.connected;
            }
            if broker.server.is_some() {
                snapshot.broker_server = broker.server;
            }
        }
        if let Some(health) = update.system_health {
            snapshot.health = Some(health);
        }

        snapshot.last_update = Some(next_stamp(snapshot.last_update, received_at));
        snapshot.revision += 1;

        let published = self.snapshot();
        // No subscribers is fine; the view is optional.
        let _ = self
            .bus
            .publish(MonitorEvent::SnapshotChanged(Arc::clone(&published)));
        published
    }
}

fn next_stamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + ChronoDuration::microseconds(1),
        _ => now,
    }
}
