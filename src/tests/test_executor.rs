#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use float_cmp::approx_eq;

    use crate::core::clock::SimulatedClock;
    use crate::core::common::PlatformType;
    use crate::core::platform::{ConnectionResult, PlatformAdapter};
    use crate::core::executor::TradeExecutor;
    use crate::core::ticks::{Tick, TickData, TickStatusFlags};
    use crate::core::trade::{
        MoneyManagement, TradeErrorCode, TradeRequest, TradeResult, TradeSignal, TradeState,
    };
    use crate::examples::sample_requests;
    use crate::examples::simulator::{SimulatorAccountInfo, SimulatorAdapter};

    fn initialized_tick(symbol: &str, bid: f64, ask: f64, time_ms: i64) -> TickData {
        let mut tick = Tick::new(ask, bid, 0.0, time_ms as u64, time_ms as u64, 0);
        tick.set_flag(TickStatusFlags::Initialized);
        let mut data = TickData::new(tick, symbol, "simulator", 5, 0, 0);
        data.set_flag(TickStatusFlags::Initialized);
        data
    }

    #[test]
    fn test_happy_sprint_end_to_end() {
        // scenario S1: admit a 60 second sprint buy, open at 1.1000, tick to
        // 1.1011, settle as a win with profit 8.0
        let clock = Arc::new(SimulatedClock::new(1_000_000));
        let mut adapter = SimulatorAdapter::new(clock.clone());
        adapter.set_open_latency_ms(5_000);
        adapter.account().set_order_interval_ms(0);

        let results: Arc<Mutex<Vec<(TradeRequest, TradeResult)>>> =
            Arc::new(Mutex::new(Vec::new()));
        {
            let sink = results.clone();
            adapter.set_trade_result_callback(Arc::new(move |request, result| {
                sink.lock().unwrap().push((request, result));
            }));
        }

        adapter.connect(Arc::new(|result: &ConnectionResult| {
            assert!(result.success);
        }));

        adapter.push_ticks(vec![initialized_tick("EURUSD", 1.0999, 1.1001, 1_000_000)]);
        assert!(adapter.place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60)));
        adapter.process();
        assert_eq!(adapter.executor().open_trades(), 1);

        // the broker confirms the open 5 seconds after admission
        clock.set_ms(1_005_000);
        adapter.process();
        adapter.process();

        // a tick arrives mid-flight and drives the provisional state
        clock.set_ms(1_060_500);
        adapter.push_ticks(vec![initialized_tick("EURUSD", 1.1010, 1.1012, 1_060_500)]);
        adapter.process();
        {
            let snapshot = results.lock().unwrap();
            let last = snapshot.last().unwrap();
            assert_eq!(last.1.live_state, TradeState::Win);
            assert!(approx_eq!(f64, last.1.close_price, 1.1011, epsilon = 1e-9));
        }

        // close date = open_date + duration = 1_065_000; the engine asks for
        // resolution and the simulator settles the win
        clock.set_ms(1_065_000);
        adapter.process();
        adapter.process();

        let snapshot = results.lock().unwrap();
        let terminal: Vec<_> = snapshot
            .iter()
            .filter(|(_, result)| result.trade_state == TradeState::Win)
            .collect();
        assert_eq!(terminal.len(), 1);
        let (_, result) = terminal[0];
        assert_eq!(result.error_code, TradeErrorCode::Success);
        assert!(approx_eq!(f64, result.profit, 8.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, result.close_price, 1.1011, epsilon = 1e-9));
        assert!(approx_eq!(f64, result.open_price, 1.1000, epsilon = 1e-9));
        assert_eq!(result.open_date, 1_005_000);
        assert_eq!(result.close_date, 1_065_000);
        assert!(approx_eq!(f64, result.balance, 10_008.0, epsilon = 1e-9));
        assert_eq!(adapter.executor().open_trades(), 0);
    }

    #[test]
    fn test_trade_ids_unique() {
        let clock = Arc::new(SimulatedClock::new(1_000_000));
        let account = Arc::new(SimulatorAccountInfo::new());
        account.set_connected(true);
        account.set_order_interval_ms(0);
        let executor =
            TradeExecutor::new(account.clone(), PlatformType::Simulator, clock.clone());

        let results: Arc<Mutex<Vec<TradeResult>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = results.clone();
            executor.set_trade_result_callback(Arc::new(move |_request, result| {
                sink.lock().unwrap().push(result);
            }));
        }

        // invalid amounts: every request fails validation and terminates
        for _ in 0..5 {
            assert!(executor.place_trade(sample_requests::sprint_buy("EURUSD", 0.0, 60)));
            executor.process();
        }

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 5);
        let mut ids: Vec<u64> = results.iter().map(|result| result.trade_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(results
            .iter()
            .all(|result| result.error_code == TradeErrorCode::AmountTooLow));
    }

    #[test]
    fn test_account_context_filled_from_provider() {
        let clock = Arc::new(SimulatedClock::new(1_000_000));
        let account = Arc::new(SimulatorAccountInfo::new());
        account.set_connected(true);
        let executor =
            TradeExecutor::new(account.clone(), PlatformType::Simulator, clock.clone());

        let results: Arc<Mutex<Vec<(TradeRequest, TradeResult)>>> =
            Arc::new(Mutex::new(Vec::new()));
        {
            let sink = results.clone();
            executor.set_trade_result_callback(Arc::new(move |request, result| {
                sink.lock().unwrap().push((request, result));
            }));
        }

        // the sample request leaves account type and currency unknown; the
        // engine fills them from the account projection
        executor.place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        executor.process();

        let snapshot = results.lock().unwrap();
        let (request, result) = snapshot.last().unwrap();
        assert_eq!(request.account_type, crate::core::common::AccountType::Demo);
        assert_eq!(request.currency, crate::core::common::CurrencyType::USD);
        assert_eq!(result.platform_type, PlatformType::Simulator);
    }

    #[test]
    fn test_place_signal_forwards_request() {
        let clock = Arc::new(SimulatedClock::new(1_000_000));
        let account = Arc::new(SimulatorAccountInfo::new());
        account.set_connected(true);
        let executor =
            TradeExecutor::new(account.clone(), PlatformType::Simulator, clock.clone());

        let mut signal = TradeSignal::new(sample_requests::sprint_buy("EURUSD", 10.0, 60));
        signal.set_money_management(MoneyManagement::FixedAmount { amount: 10.0 });
        assert!(executor.place_signal(signal));
        executor.process();
        assert_eq!(executor.open_trades(), 1);
    }

    #[test]
    fn test_per_request_callbacks_receive_clones() {
        let clock = Arc::new(SimulatedClock::new(1_000_000));
        let account = Arc::new(SimulatorAccountInfo::new());
        account.set_connected(true);
        let executor =
            TradeExecutor::new(account.clone(), PlatformType::Simulator, clock.clone());

        let seen: Arc<Mutex<Vec<TradeState>>> = Arc::new(Mutex::new(Vec::new()));
        let mut request = sample_requests::sprint_buy("EURUSD", 10.0, 60);
        {
            let sink = seen.clone();
            request.add_callback(Arc::new(move |_request, result| {
                sink.lock().unwrap().push(result.trade_state);
            }));
        }

        executor.place_trade(request);
        executor.process();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[TradeState::WaitingOpen]);
    }
}
