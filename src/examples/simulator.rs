//! Simulator platform: a complete `PlatformAdapter` that executes admitted
//! trades against a scripted market.  Doubles as the reference
//! implementation for real broker adapters and as the engine's end-to-end
//! test harness.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::*;

use crate::core::account::{
    AccountInfoData, AccountInfoRequest, AccountInfoType, AccountInfoUpdate, AccountUpdateStatus,
};
use crate::core::candles::CandleInfo;
use crate::core::clock::Clock;
use crate::core::common::{
    AccountType, CurrencyType, OptionType, OrderType, PlatformType, POISONED_MUTEX,
};
use crate::core::events::{Event, EventKind};
use crate::core::executor::TradeExecutor;
use crate::core::platform::{
    AccountInfoCallback, AuthData, CandleInfoCallback, ConnectionCallback, ConnectionResult,
    DisconnectCallback, PlatformAdapter, SymbolInfo, SymbolsCallback, SymbolsInfo,
    TickInfoCallback,
};
use crate::core::tasks::TaskManager;
use crate::core::ticks::TickData;
use crate::core::trade::{TradeRequest, TradeResult, TradeResultCallback, TradeState, Transaction};

const BALANCE_POLL_MS: i64 = 1000;

//==================================================================================================
struct AccountState {
    connected: bool,
    balance: f64,
    currency: CurrencyType,
    account_type: AccountType,
    min_amount: f64,
    max_amount: f64,
    min_refund: f64,
    max_refund: f64,
    min_duration: i64,
    max_duration: i64,
    payout: f64,
    open_trades: i64,
    max_trades: i64,
    order_interval_ms: i64,
    order_queue_timeout_s: i64,
    response_timeout_s: i64,
    symbols: Vec<String>,
}

impl Default for AccountState {
    fn default() -> Self {
        AccountState {
            connected: false,
            balance: 10_000.0,
            currency: CurrencyType::USD,
            account_type: AccountType::Demo,
            min_amount: 1.0,
            max_amount: 1_000.0,
            min_refund: 0.0,
            max_refund: 1.0,
            min_duration: 30,
            max_duration: 86_400,
            payout: 0.8,
            open_trades: 0,
            max_trades: 5,
            order_interval_ms: 200,
            order_queue_timeout_s: 30,
            response_timeout_s: 15,
            symbols: vec![
                "EURUSD".to_string(),
                "GBPUSD".to_string(),
                "USDJPY".to_string(),
                "BTCUSD".to_string(),
            ],
        }
    }
}

/// Account projection served to the engine.  Everything is settable so tests
/// can shape the account the way a live adapter would after authentication.
pub struct SimulatorAccountInfo {
    state: Mutex<AccountState>,
}

impl SimulatorAccountInfo {
    pub fn new() -> Self {
        SimulatorAccountInfo {
            state: Mutex::new(AccountState::default()),
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().expect(POISONED_MUTEX).connected = connected;
    }

    pub fn set_balance(&self, balance: f64) {
        self.state.lock().expect(POISONED_MUTEX).balance = balance;
    }

    pub fn balance(&self) -> f64 {
        self.state.lock().expect(POISONED_MUTEX).balance
    }

    /// Applies a settlement to the balance and returns the new value
    pub fn adjust_balance(&self, delta: f64) -> f64 {
        let mut state = self.state.lock().expect(POISONED_MUTEX);
        state.balance += delta;
        state.balance
    }

    pub fn set_open_trades(&self, open_trades: i64) {
        self.state.lock().expect(POISONED_MUTEX).open_trades = open_trades;
    }

    pub fn set_max_trades(&self, max_trades: i64) {
        self.state.lock().expect(POISONED_MUTEX).max_trades = max_trades;
    }

    pub fn set_order_interval_ms(&self, order_interval_ms: i64) {
        self.state.lock().expect(POISONED_MUTEX).order_interval_ms = order_interval_ms;
    }

    pub fn set_order_queue_timeout_s(&self, seconds: i64) {
        self.state.lock().expect(POISONED_MUTEX).order_queue_timeout_s = seconds;
    }

    pub fn set_response_timeout_s(&self, seconds: i64) {
        self.state.lock().expect(POISONED_MUTEX).response_timeout_s = seconds;
    }

    pub fn set_payout(&self, payout: f64) {
        self.state.lock().expect(POISONED_MUTEX).payout = payout;
    }

    pub fn set_amount_limits(&self, min_amount: f64, max_amount: f64) {
        let mut state = self.state.lock().expect(POISONED_MUTEX);
        state.min_amount = min_amount;
        state.max_amount = max_amount;
    }

    pub fn set_duration_limits(&self, min_duration_s: i64, max_duration_s: i64) {
        let mut state = self.state.lock().expect(POISONED_MUTEX);
        state.min_duration = min_duration_s;
        state.max_duration = max_duration_s;
    }

    pub fn add_symbol(&self, symbol: &str) {
        let mut state = self.state.lock().expect(POISONED_MUTEX);
        if !state.symbols.iter().any(|known| known == symbol) {
            state.symbols.push(symbol.to_string());
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.state.lock().expect(POISONED_MUTEX).symbols.clone()
    }
}

impl Default for SimulatorAccountInfo {
    fn default() -> Self {
        SimulatorAccountInfo::new()
    }
}

impl AccountInfoData for SimulatorAccountInfo {
    fn get_info_bool(&self, request: &AccountInfoRequest) -> bool {
        let state = self.state.lock().expect(POISONED_MUTEX);
        match request.info_type {
            AccountInfoType::ConnectionStatus => state.connected,
            AccountInfoType::SymbolAvailable => {
                state.symbols.iter().any(|known| *known == request.symbol)
            }
            AccountInfoType::OptionTypeAvailable => request.option_type != OptionType::Unknown,
            AccountInfoType::OrderTypeAvailable => request.order_type != OrderType::Unknown,
            AccountInfoType::AccountTypeAvailable => request.account_type != AccountType::Unknown,
            AccountInfoType::CurrencyAvailable => request.currency != CurrencyType::Unknown,
            AccountInfoType::TradeLimitNotExceeded => state.open_trades < state.max_trades,
            AccountInfoType::AmountBelowMax => request.amount <= state.max_amount,
            AccountInfoType::AmountAboveMin => request.amount >= state.min_amount,
            AccountInfoType::RefundBelowMax => request.refund <= state.max_refund,
            AccountInfoType::RefundAboveMin => request.refund >= state.min_refund,
            AccountInfoType::DurationAvailable => {
                request.option_type != OptionType::Sprint
                    || (request.duration >= state.min_duration
                        && request.duration <= state.max_duration)
            }
            AccountInfoType::ExpirationDateAvailable => {
                request.option_type != OptionType::Classic
                    || request.expiry_time > request.timestamp
            }
            AccountInfoType::PayoutAboveMin => state.payout >= request.min_payout,
            AccountInfoType::AmountBelowBalance => request.amount <= state.balance,
            _ => false,
        }
    }

    fn get_info_i64(&self, request: &AccountInfoRequest) -> i64 {
        let state = self.state.lock().expect(POISONED_MUTEX);
        match request.info_type {
            AccountInfoType::PlatformType => PlatformType::Simulator as i64,
            AccountInfoType::AccountType => state.account_type as i64,
            AccountInfoType::Currency => state.currency as i64,
            AccountInfoType::OpenTrades => state.open_trades,
            AccountInfoType::MaxTrades => state.max_trades,
            AccountInfoType::MinDuration => state.min_duration,
            AccountInfoType::MaxDuration => state.max_duration,
            AccountInfoType::OrderIntervalMs => state.order_interval_ms,
            AccountInfoType::OrderQueueTimeout => state.order_queue_timeout_s,
            AccountInfoType::ResponseTimeout => state.response_timeout_s,
            _ => 0,
        }
    }

    fn get_info_f64(&self, request: &AccountInfoRequest) -> f64 {
        let state = self.state.lock().expect(POISONED_MUTEX);
        match request.info_type {
            AccountInfoType::Balance => state.balance,
            AccountInfoType::Payout => state.payout,
            AccountInfoType::MinAmount => state.min_amount,
            AccountInfoType::MaxAmount => state.max_amount,
            AccountInfoType::MinRefund => state.min_refund,
            AccountInfoType::MaxRefund => state.max_refund,
            _ => 0.0,
        }
    }

    fn get_info_str(&self, request: &AccountInfoRequest) -> String {
        let state = self.state.lock().expect(POISONED_MUTEX);
        match request.info_type {
            AccountInfoType::PlatformType => PlatformType::Simulator.to_string(),
            AccountInfoType::AccountType => state.account_type.to_string(),
            AccountInfoType::Currency => state.currency.to_string(),
            _ => String::new(),
        }
    }
}

//==================================================================================================
/// Opaque credentials for the simulator platform
#[derive(Clone, Debug, Default)]
pub struct SimulatorAuthData {
    pub account_name: String,
}

impl AuthData for SimulatorAuthData {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Simulator
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

//==================================================================================================
/// Reference platform adapter.  Consumes `TradeRequest` events and confirms
/// opens after a configurable latency; consumes `TradeStatus` events and
/// settles against the last scripted tick; polls the balance on a periodic
/// task.
pub struct SimulatorAdapter {
    clock: Arc<dyn Clock>,
    account_info: Arc<SimulatorAccountInfo>,
    executor: TradeExecutor,
    tasks: TaskManager,
    open_inbox: Arc<Mutex<VecDeque<Transaction>>>,
    status_inbox: Arc<Mutex<VecDeque<Transaction>>>,
    pending_opens: Vec<(i64, Transaction)>,
    market: Arc<Mutex<HashMap<String, TickData>>>,
    account_info_callback: Arc<Mutex<Option<AccountInfoCallback>>>,
    candle_info_callback: Arc<Mutex<Option<CandleInfoCallback>>>,
    tick_info_callback: Arc<Mutex<Option<TickInfoCallback>>>,
    auth: Option<SimulatorAuthData>,
    open_latency_ms: i64,
    next_option_id: i64,
}

impl SimulatorAdapter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let account_info = Arc::new(SimulatorAccountInfo::new());
        let executor = TradeExecutor::new(
            account_info.clone(),
            PlatformType::Simulator,
            clock.clone(),
        );

        let open_inbox: Arc<Mutex<VecDeque<Transaction>>> = Arc::new(Mutex::new(VecDeque::new()));
        let status_inbox: Arc<Mutex<VecDeque<Transaction>>> = Arc::new(Mutex::new(VecDeque::new()));
        let account_info_callback: Arc<Mutex<Option<AccountInfoCallback>>> =
            Arc::new(Mutex::new(None));

        // the engine hands admitted trades and settlement requests to the
        // adapter through the hub; handlers only record them, the work runs
        // in process()
        {
            let inbox = open_inbox.clone();
            executor.hub().subscribe(
                EventKind::TradeRequest,
                Arc::new(move |event| {
                    if let Event::TradeRequest(transaction) = event {
                        inbox
                            .lock()
                            .expect(POISONED_MUTEX)
                            .push_back(transaction.clone());
                    }
                }),
            );
        }
        {
            let inbox = status_inbox.clone();
            executor.hub().subscribe(
                EventKind::TradeStatus,
                Arc::new(move |event| {
                    if let Event::TradeStatus(transaction) = event {
                        inbox
                            .lock()
                            .expect(POISONED_MUTEX)
                            .push_back(transaction.clone());
                    }
                }),
            );
        }
        {
            // mirror the engine's open-trade counter into the account
            // projection used by admission control
            let info = account_info.clone();
            executor.hub().subscribe(
                EventKind::OpenTrades,
                Arc::new(move |event| {
                    if let Event::OpenTrades { count, .. } = event {
                        info.set_open_trades(*count);
                    }
                }),
            );
        }

        let tasks = TaskManager::new(clock.clone());
        {
            let hub = executor.hub().clone();
            let info = account_info.clone();
            let callback_slot = account_info_callback.clone();
            let _balance_poll = tasks.add_periodic_task(
                BALANCE_POLL_MS,
                Box::new(move |_task| {
                    hub.notify_async(Event::BalanceRequest);
                    let callback = callback_slot.lock().expect(POISONED_MUTEX).clone();
                    if let Some(callback) = callback {
                        let update = AccountInfoUpdate {
                            info: info.clone(),
                            status: AccountUpdateStatus::BalanceUpdated,
                            message: String::new(),
                        };
                        callback(&update);
                    }
                }),
            );
        }

        SimulatorAdapter {
            clock,
            account_info,
            executor,
            tasks,
            open_inbox,
            status_inbox,
            pending_opens: Vec::new(),
            market: Arc::new(Mutex::new(HashMap::new())),
            account_info_callback,
            candle_info_callback: Arc::new(Mutex::new(None)),
            tick_info_callback: Arc::new(Mutex::new(None)),
            auth: None,
            open_latency_ms: 100,
            next_option_id: 1,
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn executor(&self) -> &TradeExecutor {
        &self.executor
    }

    //----------------------------------------------------------------------------------------------
    pub fn account(&self) -> &Arc<SimulatorAccountInfo> {
        &self.account_info
    }

    //----------------------------------------------------------------------------------------------
    /// Credentials installed via `configure_auth`, if any
    pub fn auth(&self) -> Option<&SimulatorAuthData> {
        self.auth.as_ref()
    }

    //----------------------------------------------------------------------------------------------
    /// Delay between admission and the simulated open confirmation
    pub fn set_open_latency_ms(&mut self, latency_ms: i64) {
        self.open_latency_ms = latency_ms;
    }

    //----------------------------------------------------------------------------------------------
    /// Feeds scripted ticks: updates the last-price table, forwards to the
    /// tick callback and queues a price update for the engine
    pub fn push_ticks(&self, ticks: Vec<TickData>) {
        {
            let mut market = self.market.lock().expect(POISONED_MUTEX);
            for tick in &ticks {
                market.insert(tick.symbol.clone(), tick.clone());
            }
        }
        let callback = self.tick_info_callback.lock().expect(POISONED_MUTEX).clone();
        if let Some(callback) = callback {
            callback(&ticks);
        }
        self.executor.hub().notify_async(Event::PriceUpdate(ticks));
    }

    //----------------------------------------------------------------------------------------------
    /// Feeds a scripted candle series to the candle callback
    pub fn push_candles(&self, candles: CandleInfo) {
        let callback = self
            .candle_info_callback
            .lock()
            .expect(POISONED_MUTEX)
            .clone();
        if let Some(callback) = callback {
            callback(&candles);
        }
    }

    //----------------------------------------------------------------------------------------------
    fn last_mid_price(&self, symbol: &str) -> f64 {
        let market = self.market.lock().expect(POISONED_MUTEX);
        market.get(symbol).map(|tick| tick.mid_price()).unwrap_or(0.0)
    }

    //----------------------------------------------------------------------------------------------
    fn confirm_open(&mut self, transaction: Transaction, now_ms: i64) {
        let option_id = self.next_option_id;
        self.next_option_id += 1;

        let update = TradeResult {
            trade_id: transaction.result.trade_id,
            option_id,
            option_hash: format!("sim-{:08x}", option_id),
            trade_state: TradeState::OpenSuccess,
            open_date: now_ms,
            open_price: self.last_mid_price(&transaction.request.symbol),
            ..Default::default()
        };
        debug!(
            "simulator opened trade {} at {}",
            update.trade_id, update.open_price
        );
        self.executor.update_trade(update);
    }

    //----------------------------------------------------------------------------------------------
    /// Resolves a trade the engine flagged as due.  Win/loss follows the
    /// price drift between open and the engine-tracked close price; a draw
    /// is a standoff and returns the stake.
    fn settle(&mut self, transaction: Transaction, now_ms: i64) {
        let request = &transaction.request;
        let result = &transaction.result;

        let close_price = if result.close_price != 0.0 {
            result.close_price
        } else {
            self.last_mid_price(&request.symbol)
        };
        let open_price = result.open_price;

        let outcome = if open_price == 0.0 || close_price == open_price {
            TradeState::Standoff
        } else {
            let won = match request.order_type {
                OrderType::Buy => close_price > open_price,
                OrderType::Sell => close_price < open_price,
                _ => false,
            };
            if won {
                TradeState::Win
            } else {
                TradeState::Loss
            }
        };

        let payout = if result.payout != 0.0 {
            result.payout
        } else {
            self.account_info
                .get_info_f64(&AccountInfoRequest::new(AccountInfoType::Payout, 0))
        };
        let profit = match outcome {
            TradeState::Win => result.amount * payout,
            TradeState::Loss => request.refund * result.amount - result.amount,
            _ => 0.0,
        };
        let balance = self.account_info.adjust_balance(profit);

        let update = TradeResult {
            trade_id: result.trade_id,
            trade_state: outcome,
            close_price,
            close_date: if result.close_date > 0 {
                result.close_date
            } else {
                now_ms
            },
            payout,
            profit,
            balance,
            ..Default::default()
        };
        info!(
            "simulator settled trade {}: {:?}, profit {}",
            update.trade_id, outcome, profit
        );
        self.executor.update_trade(update);
    }
}

impl PlatformAdapter for SimulatorAdapter {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Simulator
    }

    //----------------------------------------------------------------------------------------------
    fn configure_auth(&mut self, auth: Box<dyn AuthData>) -> bool {
        if auth.platform_type() != PlatformType::Simulator {
            warn!("auth payload for {} ignored", auth.platform_type());
            return false;
        }
        match auth.as_any().downcast_ref::<SimulatorAuthData>() {
            Some(data) => {
                self.auth = Some(data.clone());
                true
            }
            None => false,
        }
    }

    //----------------------------------------------------------------------------------------------
    fn connect(&mut self, callback: ConnectionCallback) {
        info!("simulator connecting");
        self.account_info.set_connected(true);

        let account_callback = self
            .account_info_callback
            .lock()
            .expect(POISONED_MUTEX)
            .clone();
        if let Some(account_callback) = account_callback {
            let update = AccountInfoUpdate {
                info: self.account_info.clone(),
                status: AccountUpdateStatus::Connected,
                message: String::new(),
            };
            account_callback(&update);
        }
        callback(&ConnectionResult::ok());
    }

    //----------------------------------------------------------------------------------------------
    fn disconnect(&mut self, callback: DisconnectCallback) {
        info!("simulator disconnecting");
        // the queue manager listens for this and finalizes every trade
        self.executor.hub().notify(&Event::DisconnectRequest {
            callback: callback.clone(),
        });
        self.account_info.set_connected(false);

        let account_callback = self
            .account_info_callback
            .lock()
            .expect(POISONED_MUTEX)
            .clone();
        if let Some(account_callback) = account_callback {
            let update = AccountInfoUpdate {
                info: self.account_info.clone(),
                status: AccountUpdateStatus::Disconnected,
                message: String::new(),
            };
            account_callback(&update);
        }
        callback();
    }

    //----------------------------------------------------------------------------------------------
    fn place_trade(&mut self, request: TradeRequest) -> bool {
        self.executor.place_trade(request)
    }

    //----------------------------------------------------------------------------------------------
    fn set_trade_result_callback(&mut self, callback: TradeResultCallback) {
        self.executor.set_trade_result_callback(callback);
    }

    //----------------------------------------------------------------------------------------------
    fn set_account_info_callback(&mut self, callback: AccountInfoCallback) {
        *self.account_info_callback.lock().expect(POISONED_MUTEX) = Some(callback);
    }

    //----------------------------------------------------------------------------------------------
    fn set_candle_info_callback(&mut self, callback: CandleInfoCallback) {
        *self.candle_info_callback.lock().expect(POISONED_MUTEX) = Some(callback);
    }

    //----------------------------------------------------------------------------------------------
    fn set_tick_info_callback(&mut self, callback: TickInfoCallback) {
        *self.tick_info_callback.lock().expect(POISONED_MUTEX) = Some(callback);
    }

    //----------------------------------------------------------------------------------------------
    fn get_symbols(&self, callback: SymbolsCallback) {
        let symbols = self
            .account_info
            .symbols()
            .into_iter()
            .map(|symbol| SymbolInfo {
                symbol,
                provider: "simulator".to_string(),
                price_digits: 5,
                volume_digits: 0,
            })
            .collect();
        callback(&SymbolsInfo { symbols });
    }

    //----------------------------------------------------------------------------------------------
    fn process(&mut self) {
        self.executor.process();
        let now = self.clock.now_ms();

        // admitted trades open after the configured latency
        loop {
            let transaction = self.open_inbox.lock().expect(POISONED_MUTEX).pop_front();
            match transaction {
                Some(transaction) => self
                    .pending_opens
                    .push((now + self.open_latency_ms, transaction)),
                None => break,
            }
        }
        let mut due = Vec::new();
        self.pending_opens.retain_mut(|(due_ms, transaction)| {
            if *due_ms <= now {
                due.push(std::mem::take(transaction));
                false
            } else {
                true
            }
        });
        for transaction in due {
            self.confirm_open(transaction, now);
        }

        // settle trades the engine flagged for resolution
        loop {
            let transaction = self.status_inbox.lock().expect(POISONED_MUTEX).pop_front();
            match transaction {
                Some(transaction) => self.settle(transaction, now),
                None => break,
            }
        }

        self.tasks.process();
    }

    //----------------------------------------------------------------------------------------------
    fn shutdown(&mut self) {
        info!("simulator shutting down");
        self.executor.shutdown();
        self.tasks.shutdown();
        self.account_info.set_connected(false);
    }

    //----------------------------------------------------------------------------------------------
    fn get_account_info_bool(&self, request: &AccountInfoRequest) -> bool {
        self.account_info.get_info_bool(request)
    }

    fn get_account_info_i64(&self, request: &AccountInfoRequest) -> i64 {
        self.account_info.get_info_i64(request)
    }

    fn get_account_info_f64(&self, request: &AccountInfoRequest) -> f64 {
        self.account_info.get_info_f64(request)
    }

    fn get_account_info_str(&self, request: &AccountInfoRequest) -> String {
        self.account_info.get_info_str(request)
    }
}
