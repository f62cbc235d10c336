#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::core::clock::SimulatedClock;
    use crate::core::common::PlatformType;
    use crate::core::events::{Event, EventKind};
    use crate::core::executor::TradeExecutor;
    use crate::core::state::TradeStateManager;
    use crate::core::ticks::{Tick, TickData, TickStatusFlags};
    use crate::core::trade::{TradeErrorCode, TradeRequest, TradeResult, TradeState};
    use crate::examples::sample_requests;
    use crate::examples::simulator::SimulatorAccountInfo;

    const T0: i64 = 1_000_000;

    struct Rig {
        clock: Arc<SimulatedClock>,
        account: Arc<SimulatorAccountInfo>,
        executor: TradeExecutor,
        results: Arc<Mutex<Vec<(TradeRequest, TradeResult)>>>,
        trade_request_events: Arc<Mutex<Vec<u64>>>,
    }

    fn rig() -> Rig {
        let clock = Arc::new(SimulatedClock::new(T0));
        let account = Arc::new(SimulatorAccountInfo::new());
        account.set_connected(true);
        account.set_order_interval_ms(0);
        account.set_duration_limits(1, 86_400);

        let executor =
            TradeExecutor::new(account.clone(), PlatformType::Simulator, clock.clone());

        // mirror the engine's open-trade counter the way an adapter would
        {
            let info = account.clone();
            executor.hub().subscribe(
                EventKind::OpenTrades,
                Arc::new(move |event| {
                    if let Event::OpenTrades { count, .. } = event {
                        info.set_open_trades(*count);
                    }
                }),
            );
        }

        let results: Arc<Mutex<Vec<(TradeRequest, TradeResult)>>> =
            Arc::new(Mutex::new(Vec::new()));
        {
            let sink = results.clone();
            executor.set_trade_result_callback(Arc::new(move |request, result| {
                sink.lock().unwrap().push((request, result));
            }));
        }

        let trade_request_events: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = trade_request_events.clone();
            executor.hub().subscribe(
                EventKind::TradeRequest,
                Arc::new(move |event| {
                    if let Event::TradeRequest(transaction) = event {
                        sink.lock().unwrap().push(transaction.result.trade_id);
                    }
                }),
            );
        }

        Rig {
            clock,
            account,
            executor,
            results,
            trade_request_events,
        }
    }

    fn terminal_results(rig: &Rig) -> Vec<(TradeRequest, TradeResult)> {
        rig.results
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, result)| TradeStateManager::is_terminal_state(result.trade_state))
            .cloned()
            .collect()
    }

    fn initialized_tick(symbol: &str, bid: f64, ask: f64, time_ms: i64) -> TickData {
        let mut tick = Tick::new(ask, bid, 0.0, time_ms as u64, time_ms as u64, 0);
        tick.set_flag(TickStatusFlags::Initialized);
        let mut data = TickData::new(tick, symbol, "test", 5, 0, 0);
        data.set_flag(TickStatusFlags::Initialized);
        data
    }

    #[test]
    fn test_admission_publishes_trade_request_event() {
        let rig = rig();
        assert!(rig
            .executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60)));
        rig.executor.process();

        assert_eq!(rig.trade_request_events.lock().unwrap().len(), 1);
        assert_eq!(rig.executor.open_trades(), 1);

        let results = rig.results.lock().unwrap();
        let last = results.last().unwrap();
        assert_eq!(last.1.trade_state, TradeState::WaitingOpen);
        assert_eq!(last.1.send_date, T0);
        assert_eq!(last.1.place_date, T0);
    }

    #[test]
    fn test_single_admission_per_drain() {
        let rig = rig();
        for _ in 0..3 {
            rig.executor
                .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        }
        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 1);

        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 2);

        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 3);
        assert_eq!(rig.trade_request_events.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_order_interval_rate_limit_boundary() {
        let rig = rig();
        rig.account.set_order_interval_ms(1_000);
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor
            .place_trade(sample_requests::sprint_buy("GBPUSD", 10.0, 60));

        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 1);

        // one millisecond short of the interval: nothing admitted
        rig.clock.set_ms(T0 + 999);
        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 1);

        // exactly at the interval: admission must succeed
        rig.clock.set_ms(T0 + 1_000);
        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 2);
    }

    #[test]
    fn test_validation_failure_no_event_published() {
        // scenario S4: an amount below the minimum fails immediately and no
        // trade request event reaches the adapter
        let rig = rig();
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 0.01, 60));
        rig.executor.process();

        assert!(rig.trade_request_events.lock().unwrap().is_empty());
        assert_eq!(rig.executor.open_trades(), 0);

        let terminal = terminal_results(&rig);
        assert_eq!(terminal.len(), 1);
        assert_eq!(terminal[0].1.error_code, TradeErrorCode::AmountTooLow);
        assert_eq!(terminal[0].1.trade_state, TradeState::OpenError);
    }

    #[test]
    fn test_queue_timeout_expires_pending() {
        // scenario S2: the queue is saturated and the pending trade expires
        // after exactly order_queue_timeout
        let rig = rig();
        rig.account.set_order_queue_timeout_s(30);
        rig.account.set_max_trades(1);
        rig.account.set_open_trades(1);

        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        assert!(terminal_results(&rig).is_empty());

        rig.clock.set_ms(T0 + 29_999);
        rig.executor.process();
        assert!(terminal_results(&rig).is_empty());

        rig.clock.set_ms(T0 + 30_000);
        rig.executor.process();

        let terminal = terminal_results(&rig);
        assert_eq!(terminal.len(), 1);
        assert_eq!(terminal[0].1.error_code, TradeErrorCode::LongQueueWait);
        assert_eq!(terminal[0].1.trade_state, TradeState::OpenError);
    }

    #[test]
    fn test_response_timeout_boundary() {
        // scenario S3: the broker confirms the open but never settles
        let rig = rig();
        rig.clock.set_ms(0);
        rig.account.set_response_timeout_s(15);

        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        let trade_id = rig.trade_request_events.lock().unwrap()[0];

        // adapter confirms the open without an open date; the close date
        // falls back to place_date + duration = 60_000
        rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::OpenSuccess,
            open_price: 1.1,
            ..Default::default()
        });
        rig.executor.process();

        // exactly at close_date + response_timeout: not expired yet
        rig.clock.set_ms(75_000);
        rig.executor.process();
        assert!(terminal_results(&rig).is_empty());

        // one millisecond later the trade times out
        rig.clock.set_ms(75_001);
        rig.executor.process();
        let terminal = terminal_results(&rig);
        assert_eq!(terminal.len(), 1);
        assert_eq!(terminal[0].1.error_code, TradeErrorCode::LongResponseWait);
        assert_eq!(terminal[0].1.trade_state, TradeState::CheckError);
        assert_eq!(rig.executor.open_trades(), 0);
    }

    #[test]
    fn test_due_trade_emits_trade_status() {
        let rig = rig();
        rig.clock.set_ms(0);

        let status_events: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = status_events.clone();
            rig.executor.hub().subscribe(
                EventKind::TradeStatus,
                Arc::new(move |event| {
                    if let Event::TradeStatus(transaction) = event {
                        sink.lock().unwrap().push(transaction.result.trade_id);
                    }
                }),
            );
        }

        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        let trade_id = rig.trade_request_events.lock().unwrap()[0];
        rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::OpenSuccess,
            open_price: 1.1,
            open_date: 1_000,
            ..Default::default()
        });
        rig.executor.process();
        assert!(status_events.lock().unwrap().is_empty());

        // close date = open_date + duration = 61_000
        rig.clock.set_ms(61_000);
        rig.executor.process();
        assert_eq!(status_events.lock().unwrap().as_slice(), &[trade_id]);
    }

    #[test]
    fn test_price_update_drives_live_state_only() {
        let rig = rig();
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        let trade_id = rig.trade_request_events.lock().unwrap()[0];
        rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::OpenSuccess,
            open_price: 1.1000,
            open_date: T0,
            ..Default::default()
        });
        rig.executor.process();

        rig.executor
            .hub()
            .notify_async(Event::PriceUpdate(vec![initialized_tick(
                "EURUSD", 1.1010, 1.1012, T0 + 1_000,
            )]));
        rig.executor.process();

        let results = rig.results.lock().unwrap();
        let last = results.last().unwrap();
        assert_eq!(last.1.live_state, TradeState::Win);
        // the authoritative state does not move on ticks
        assert_eq!(last.1.trade_state, TradeState::InProgress);
        assert!((last.1.close_price - 1.1011).abs() < 1e-9);
    }

    #[test]
    fn test_uninitialized_tick_ignored() {
        let rig = rig();
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        let trade_id = rig.trade_request_events.lock().unwrap()[0];
        rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::OpenSuccess,
            open_price: 1.1000,
            open_date: T0,
            ..Default::default()
        });
        rig.executor.process();

        // tick without the INITIALIZED flag must not touch the live state
        let bare = TickData::new(
            Tick::new(1.2002, 1.2000, 0.0, T0 as u64, T0 as u64, 0),
            "EURUSD",
            "test",
            5,
            0,
            0,
        );
        rig.executor.hub().notify_async(Event::PriceUpdate(vec![bare]));
        rig.executor.process();

        let results = rig.results.lock().unwrap();
        let last = results.last().unwrap();
        assert_ne!(last.1.live_state, TradeState::Win);
        assert_eq!(last.1.close_price, 0.0);
    }

    #[test]
    fn test_disconnect_cascade() {
        // scenario S5: two pending and three open trades, then a disconnect
        let rig = rig();
        rig.account.set_max_trades(3);

        for _ in 0..5 {
            rig.executor
                .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        }
        // one admission per drain
        rig.executor.process();
        rig.executor.process();
        rig.executor.process();
        assert_eq!(rig.executor.open_trades(), 3);

        rig.executor.hub().notify(&Event::DisconnectRequest {
            callback: Arc::new(|| {}),
        });

        let terminal = terminal_results(&rig);
        assert_eq!(terminal.len(), 5);
        let open_errors = terminal
            .iter()
            .filter(|(_, result)| result.trade_state == TradeState::OpenError)
            .count();
        let check_errors = terminal
            .iter()
            .filter(|(_, result)| result.trade_state == TradeState::CheckError)
            .count();
        assert_eq!(open_errors, 2);
        assert_eq!(check_errors, 3);
        assert!(terminal
            .iter()
            .all(|(_, result)| result.error_code == TradeErrorCode::ClientForcedClose));
        assert_eq!(rig.executor.open_trades(), 0);
    }

    #[test]
    fn test_exactly_one_terminal_dispatch_per_trade() {
        let rig = rig();
        rig.account.set_max_trades(10);
        for _ in 0..4 {
            rig.executor
                .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        }
        for _ in 0..4 {
            rig.executor.process();
        }
        rig.executor.shutdown();
        // settle anything the shutdown left behind
        rig.executor.process();

        let terminal = terminal_results(&rig);
        assert_eq!(terminal.len(), 4);
        let mut ids: Vec<u64> = terminal.iter().map(|(_, result)| result.trade_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_update_trade_ignores_terminal_results() {
        let rig = rig();
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.executor.process();
        let trade_id = rig.trade_request_events.lock().unwrap()[0];

        assert!(rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::Win,
            profit: 8.0,
            ..Default::default()
        }));
        // the trade is terminal now; further updates must be rejected
        assert!(!rig.executor.update_trade(TradeResult {
            trade_id,
            trade_state: TradeState::Loss,
            ..Default::default()
        }));
    }

    #[test]
    fn test_update_trade_unknown_id() {
        let rig = rig();
        assert!(!rig.executor.update_trade(TradeResult {
            trade_id: 777,
            trade_state: TradeState::Win,
            ..Default::default()
        }));
    }

    #[test]
    fn test_timeline_ordering_invariant() {
        let rig = rig();
        rig.clock.set_ms(T0);
        rig.executor
            .place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        rig.clock.set_ms(T0 + 500);
        rig.executor.process();

        let results = rig.results.lock().unwrap();
        for (_, result) in results.iter() {
            if result.send_date != 0 {
                assert!(result.place_date <= result.send_date);
            }
            if result.close_date != 0 && result.send_date != 0 {
                assert!(result.send_date <= result.close_date);
            }
        }
    }
}
