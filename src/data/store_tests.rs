//! Unit tests for SnapshotStore - partial merge semantics.

#[cfg(test)]
mod store_tests {
    use crate::bus::EventBus;
    use crate::data::store::{SnapshotStore, SystemSnapshot};
    use crate::events::MonitorEvent;
    use crate::protocol::types::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn quote(price: f64) -> MarketQuote {
        MarketQuote {
            price,
            change: 12.5,
            change_percent: 0.28,
            volume: 2_300_000.0,
            volatility_index: None,
            timestamp: None,
        }
    }

    fn signal(symbol: &str, side: Side) -> Signal {
        Signal {
            side,
            symbol: symbol.to_string(),
            confidence: 0.9,
            entry_price: 4500.0,
            stop_loss: 4470.0,
            take_profit: 4518.0,
            source: "AI Support @ 4480.00".to_string(),
            timestamp: None,
        }
    }

    fn position(symbol: &str, profit: f64) -> Position {
        Position {
            ticket: None,
            symbol: symbol.to_string(),
            side: Side::Buy,
            volume: 0.1,
            price_open: 4490.0,
            price_current: 4500.0,
            profit,
            swap: None,
            commission: None,
            comment: None,
        }
    }

    fn market_update(symbol: &str, price: f64) -> SystemUpdate {
        let mut market = BTreeMap::new();
        market.insert(symbol.to_string(), quote(price));
        SystemUpdate {
            market_data: Some(market),
            ..Default::default()
        }
    }

    fn t(secs: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_store_starts_empty() {
        let store = SnapshotStore::new(EventBus::new(16));
        let snapshot = store.snapshot();
        assert_eq!(*snapshot, SystemSnapshot::default());
        assert!(snapshot.is_empty());
        assert!(snapshot.last_update.is_none());
    }

    #[test]
    fn test_market_only_update_leaves_other_groups() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        let snapshot = store.merge(market_update("SPX", 4500.25), t(0));

        assert_eq!(snapshot.market_data["SPX"].price, 4500.25);
        assert!(snapshot.ai_levels.is_empty());
        assert!(snapshot.trading_signals.is_empty());
        assert!(snapshot.account.is_none());
        assert!(snapshot.health.is_none());
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.last_update, Some(t(0)));
    }

    #[test]
    fn test_absent_groups_retain_previous_values() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(
            SystemUpdate {
                trading_signals: Some(vec![signal("US500", Side::Buy)]),
                system_health: Some(SystemHealth {
                    uptime: Some("99.9%".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            t(0),
        );
        let snapshot = store.merge(market_update("NDX", 15800.0), t(1));

        assert_eq!(snapshot.trading_signals.len(), 1);
        assert_eq!(
            snapshot.health.as_ref().unwrap().uptime.as_deref(),
            Some("99.9%")
        );
        assert_eq!(snapshot.market_data["NDX"].price, 15800.0);
    }

    #[test]
    fn test_market_group_is_replaced_not_merged() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(market_update("SPX", 4500.0), t(0));
        let snapshot = store.merge(market_update("NDX", 15800.0), t(1));

        assert!(!snapshot.market_data.contains_key("SPX"));
        assert_eq!(snapshot.market_data.len(), 1);
    }

    #[test]
    fn test_signals_replaced_wholesale() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(
            SystemUpdate {
                trading_signals: Some(vec![
                    signal("US500", Side::Buy),
                    signal("US100", Side::Sell),
                ]),
                ..Default::default()
            },
            t(0),
        );
        let snapshot = store.merge(
            SystemUpdate {
                trading_signals: Some(vec![signal("US30", Side::Sell)]),
                ..Default::default()
            },
            t(1),
        );

        assert_eq!(snapshot.trading_signals, vec![signal("US30", Side::Sell)]);
    }

    #[test]
    fn test_empty_signal_list_clears() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(
            SystemUpdate {
                trading_signals: Some(vec![signal("US500", Side::Buy)]),
                ..Default::default()
            },
            t(0),
        );
        let snapshot = store.merge(
            SystemUpdate {
                trading_signals: Some(vec![]),
                ..Default::default()
            },
            t(1),
        );

        assert!(snapshot.trading_signals.is_empty());
    }

    #[test]
    fn test_account_and_positions_are_independent() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(
            SystemUpdate {
                mt5_status: Some(BrokerStatus {
                    connected: Some(true),
                    server: Some("Railway-Demo".to_string()),
                    account: Some(Account {
                        login: Some("12345678".to_string()),
                        balance: 10_000.0,
                        equity: 10_150.0,
                        margin: 15.0,
                        free_margin: None,
                    }),
                    positions: Some(vec![position("US500", 150.0), position("US100", -20.0)]),
                }),
                ..Default::default()
            },
            t(0),
        );

        // Positions only: account must survive
        let snapshot = store.merge(
            SystemUpdate {
                mt5_status: Some(BrokerStatus {
                    positions: Some(vec![position("US30", 5.0)]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            t(1),
        );

        let account = snapshot.account.as_ref().unwrap();
        assert_eq!(account.balance, 10_000.0);
        assert_eq!(account.pnl, 150.0);
        assert_eq!(snapshot.positions, vec![position("US30", 5.0)]);
        assert_eq!(snapshot.broker_connected, Some(true));
        assert_eq!(snapshot.broker_server.as_deref(), Some("Railway-Demo"));
    }

    #[test]
    fn test_pnl_recomputed_from_new_account() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        for (equity, expected) in [(10_200.0, 200.0), (9_950.0, -50.0)] {
            let snapshot = store.merge(
                SystemUpdate {
                    mt5_status: Some(BrokerStatus {
                        account: Some(Account {
                            login: None,
                            balance: 10_000.0,
                            equity,
                            margin: 0.0,
                            free_margin: None,
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                t(0),
            );
            assert_eq!(snapshot.account.as_ref().unwrap().pnl, expected);
        }
    }

    #[test]
    fn test_empty_update_still_stamps() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        let first = store.merge(SystemUpdate::default(), t(0));
        let second = store.merge(SystemUpdate::default(), t(5));

        assert_eq!(first.last_update, Some(t(0)));
        assert_eq!(second.last_update, Some(t(5)));
        assert_eq!(second.revision, 2);
        assert!(second.market_data.is_empty());
    }

    #[test]
    fn test_timestamp_strictly_increases_when_clock_stalls() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        let a = store.merge(SystemUpdate::default(), t(10));
        let b = store.merge(SystemUpdate::default(), t(10));
        let c = store.merge(SystemUpdate::default(), t(3));

        assert!(b.last_update > a.last_update);
        assert!(c.last_update > b.last_update);
    }

    #[test]
    fn test_earlier_reader_is_not_mutated() {
        let mut store = SnapshotStore::new(EventBus::new(16));

        store.merge(market_update("SPX", 4500.0), t(0));
        let held = store.snapshot();
        store.merge(market_update("SPX", 4600.0), t(1));

        assert_eq!(held.market_data["SPX"].price, 4500.0);
        assert_eq!(store.snapshot().market_data["SPX"].price, 4600.0);
    }

    #[tokio::test]
    async fn test_merge_publishes_one_notification() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut store = SnapshotStore::new(bus);

        let merged = store.merge(market_update("SPX", 4500.25), t(0));

        match rx.recv().await.unwrap() {
            MonitorEvent::SnapshotChanged(snapshot) => assert!(Arc::ptr_eq(&snapshot, &merged)),
            other => panic!("Expected SnapshotChanged, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
