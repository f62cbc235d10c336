//! Trade queue manager: owns the pending queue and the open set, enforces
//! admission control (rate limit, concurrency cap, queue-age timeout) and
//! drives every trade to exactly one terminal dispatch.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::*;

use crate::core::account::{AccountInfoProvider, AccountInfoType};
use crate::core::clock::{ms_to_sec, sec_to_ms, Clock};
use crate::core::common::{AccountType, CurrencyType, OptionType, PlatformType, POISONED_MUTEX};
use crate::core::events::{tick_by_symbol, Event, EventHub, EventListener};
use crate::core::ids::TradeIdGenerator;
use crate::core::state::TradeStateManager;
use crate::core::ticks::{TickData, TickStatusFlags};
use crate::core::trade::{
    TradeErrorCode, TradeRequest, TradeResult, TradeResultCallback, TradeState, Transaction,
};

//==================================================================================================
/// State shared between the queue manager and its admission handle
pub(crate) struct QueueShared {
    pending_transactions: Mutex<VecDeque<Transaction>>,
    trade_result_callback: Mutex<Option<TradeResultCallback>>,
}

//==================================================================================================
/// Cross-thread entry points into the queue.  Cheap to clone and safe to use
/// from callbacks while the manager is mid-`process()`: admission only takes
/// the pending-queue mutex, never the manager itself.
#[derive(Clone)]
pub struct TradeQueueHandle {
    shared: Arc<QueueShared>,
    account_info: AccountInfoProvider,
    id_generator: Arc<TradeIdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TradeQueueHandle {
    //----------------------------------------------------------------------------------------------
    /// Fills in missing account context, assigns the trade id and place
    /// date, and pushes the transaction onto the pending queue.  The
    /// optional `preprocess` hook can veto by returning false.
    pub fn add_trade<F>(
        &self,
        mut request: TradeRequest,
        platform_type: PlatformType,
        mut preprocess: F,
    ) -> bool
    where
        F: FnMut(&TradeRequest, &mut TradeResult) -> bool,
    {
        if request.account_type == AccountType::Unknown {
            request.account_type = self.account_info.account_type(0);
        }
        if request.currency == CurrencyType::Unknown {
            request.currency = self.account_info.currency(0);
        }

        let mut result = request.create_trade_result();
        result.trade_id = self.id_generator.next_id();
        result.place_date = self.clock.now_ms();
        result.platform_type = platform_type;

        if !preprocess(&request, &mut result) {
            return false;
        }

        trace!("trade {} queued for {}", result.trade_id, request.symbol);
        let mut pending = self
            .shared
            .pending_transactions
            .lock()
            .expect(POISONED_MUTEX);
        pending.push_back(Transaction::new(request, result));
        true
    }

    //----------------------------------------------------------------------------------------------
    /// Installs the process-wide trade result callback
    pub fn set_trade_result_callback(&self, callback: TradeResultCallback) {
        let mut slot = self
            .shared
            .trade_result_callback
            .lock()
            .expect(POISONED_MUTEX);
        *slot = Some(callback);
    }
}

//==================================================================================================
/// The lifecycle engine.  `process()` must be driven from one consistent
/// thread; the open set is touched only there.
///
/// Subscribed events: `PriceUpdate`, `DisconnectRequest`.
/// Emitted events: `TradeRequest`, `TradeStatus`, `TradeTransaction`,
/// `OpenTrades`.
pub struct TradeQueueManager {
    shared: Arc<QueueShared>,
    account_info: AccountInfoProvider,
    state_manager: TradeStateManager,
    hub: Arc<EventHub>,
    clock: Arc<dyn Clock>,
    open_transactions: Vec<Transaction>,
    /// Timestamp of the last successful admission; 0 = none yet
    last_order_time: i64,
    open_trades: i64,
}

impl TradeQueueManager {
    pub fn new(
        hub: Arc<EventHub>,
        account_info: AccountInfoProvider,
        state_manager: TradeStateManager,
        clock: Arc<dyn Clock>,
        id_generator: Arc<TradeIdGenerator>,
    ) -> (Self, TradeQueueHandle) {
        let shared = Arc::new(QueueShared {
            pending_transactions: Mutex::new(VecDeque::new()),
            trade_result_callback: Mutex::new(None),
        });
        let handle = TradeQueueHandle {
            shared: shared.clone(),
            account_info: account_info.clone(),
            id_generator,
            clock: clock.clone(),
        };
        let manager = TradeQueueManager {
            shared,
            account_info,
            state_manager,
            hub,
            clock,
            open_transactions: Vec::new(),
            last_order_time: 0,
            open_trades: 0,
        };
        (manager, handle)
    }

    //----------------------------------------------------------------------------------------------
    /// Number of trades currently in the open set
    pub fn open_trades(&self) -> i64 {
        self.open_trades
    }

    //----------------------------------------------------------------------------------------------
    /// Runs the pending, closing and finalizing passes once
    pub fn process(&mut self) {
        self.process_pending_transactions();
        self.process_closing_transactions();
        self.process_finalizing_transactions();
    }

    //----------------------------------------------------------------------------------------------
    /// Merges a broker-reported result into the matching open transaction.
    /// This is how adapters bind late broker identifiers, confirm opens and
    /// deliver settlements; the match key is the engine-assigned `trade_id`.
    /// Call from the driving thread only, never from inside an event handler.
    pub fn update_trade(&mut self, update: TradeResult) -> bool {
        for transaction in &mut self.open_transactions {
            if transaction.result.trade_id != update.trade_id {
                continue;
            }
            // terminal results are immutable
            if TradeStateManager::is_terminal_state(transaction.result.trade_state) {
                return false;
            }
            let result = &mut transaction.result;
            if !update.option_hash.is_empty() {
                result.option_hash = update.option_hash.clone();
            }
            if update.option_id != 0 {
                result.option_id = update.option_id;
            }
            if update.open_price != 0.0 {
                result.open_price = update.open_price;
            }
            if update.close_price != 0.0 {
                result.close_price = update.close_price;
            }
            if update.open_date != 0 {
                result.open_date = update.open_date;
            }
            if update.close_date != 0 {
                result.close_date = update.close_date;
            }
            if update.payout != 0.0 {
                result.payout = update.payout;
            }
            if update.profit != 0.0 {
                result.profit = update.profit;
            }
            if update.balance != 0.0 {
                result.balance = update.balance;
            }
            if update.delay != 0 {
                result.delay = update.delay;
            }
            if update.ping != 0 {
                result.ping = update.ping;
            }
            if update.error_code != TradeErrorCode::Success {
                result.error_code = update.error_code;
                result.error_desc = if update.error_desc.is_empty() {
                    update.error_code.message().to_string()
                } else {
                    update.error_desc.clone()
                };
            }
            if update.trade_state != TradeState::Unknown {
                result.trade_state = update.trade_state;
                result.live_state = update.trade_state;
            }
            return true;
        }
        warn!("update for unknown trade {}", update.trade_id);
        false
    }

    //----------------------------------------------------------------------------------------------
    /// Terminalizes everything: pending trades as `OpenError`, open trades as
    /// `CheckError`, all with `ClientForcedClose`.
    pub fn finalize_all_trades(&mut self) {
        info!("finalizing all trades");
        let pending: Vec<Transaction> = {
            let mut guard = self
                .shared
                .pending_transactions
                .lock()
                .expect(POISONED_MUTEX);
            guard.drain(..).collect()
        };

        let timestamp = self.clock.now_ms();
        for mut transaction in pending {
            self.state_manager.finalize_with_error(
                &mut transaction,
                TradeErrorCode::ClientForcedClose,
                TradeState::OpenError,
                timestamp,
                None,
            );
            self.dispatch_trade_event(&transaction);
        }

        let open = std::mem::take(&mut self.open_transactions);
        for mut transaction in open {
            self.state_manager.finalize_with_error(
                &mut transaction,
                TradeErrorCode::ClientForcedClose,
                TradeState::CheckError,
                timestamp,
                None,
            );
            self.decrement_open_trades(&transaction);
            self.dispatch_trade_event(&transaction);
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Expires stale pending trades and admits at most one transaction per
    /// drain.  The pending mutex is released around the per-transaction work
    /// so callbacks can enqueue follow-up trades.
    fn process_pending_transactions(&mut self) {
        let shared = self.shared.clone();
        let mut pending = shared.pending_transactions.lock().expect(POISONED_MUTEX);
        if pending.is_empty() {
            return;
        }

        let timestamp = self.clock.now_ms();
        let mut canceled: Vec<Transaction> = Vec::new();
        self.clean_expired_transactions(timestamp, &mut pending, &mut canceled);

        if let Some(mut transaction) = self.pop_next_transaction(&mut pending) {
            drop(pending);

            transaction.result.error_code =
                self.state_manager.validate_request(&transaction.request);
            if transaction.result.error_code == TradeErrorCode::Success {
                let now = self.clock.now_ms();
                trace!(
                    "trade {} admitted ({})",
                    transaction.result.trade_id,
                    transaction.request.symbol
                );
                transaction.result.trade_state = TradeState::WaitingOpen;
                transaction.result.live_state = TradeState::WaitingOpen;
                transaction.result.send_date = now;
                transaction.result.balance = self.account_info.get_for_trade_f64(
                    AccountInfoType::Balance,
                    &transaction.request,
                    0,
                );
                transaction.result.payout = self.account_info.get_for_trade_f64(
                    AccountInfoType::Payout,
                    &transaction.request,
                    ms_to_sec(now),
                );
                self.last_order_time = now;

                self.increment_open_trades(&transaction);
                self.dispatch_trade_event(&transaction);
                self.hub.notify(&Event::TradeRequest(transaction.clone()));
                self.open_transactions.push(transaction);
            } else {
                let error_code = transaction.result.error_code;
                debug!(
                    "trade {} rejected: {}",
                    transaction.result.trade_id, error_code
                );
                self.state_manager.finalize_with_error(
                    &mut transaction,
                    error_code,
                    TradeState::OpenError,
                    timestamp,
                    None,
                );
                self.dispatch_trade_event(&transaction);
            }
        } else {
            drop(pending);
        }

        self.handle_canceled_transactions(canceled);
    }

    //----------------------------------------------------------------------------------------------
    /// Moves every pending transaction older than the queue timeout into
    /// `canceled`
    fn clean_expired_transactions(
        &self,
        current_time_ms: i64,
        pending: &mut VecDeque<Transaction>,
        canceled: &mut Vec<Transaction>,
    ) {
        let timeout_ms = sec_to_ms(self.account_info.get_i64(AccountInfoType::OrderQueueTimeout, 0));
        let mut index = 0;
        while index < pending.len() {
            let delay_ms = current_time_ms - pending[index].result.place_date;
            if delay_ms >= timeout_ms {
                if let Some(transaction) = pending.remove(index) {
                    canceled.push(transaction);
                }
            } else {
                index += 1;
            }
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Pops the next admissible transaction, honoring the order interval and
    /// the per-request concurrency cap
    fn pop_next_transaction(&self, pending: &mut VecDeque<Transaction>) -> Option<Transaction> {
        let front = pending.front()?;

        let order_interval_ms = self.account_info.get_i64(AccountInfoType::OrderIntervalMs, 0);
        let now = self.clock.now_ms();
        if self.last_order_time != 0 && now - self.last_order_time < order_interval_ms {
            return None;
        }

        let open_trades =
            self.account_info
                .get_for_trade_i64(AccountInfoType::OpenTrades, &front.request, 0);
        let max_trades =
            self.account_info
                .get_for_trade_i64(AccountInfoType::MaxTrades, &front.request, 0);
        if open_trades < max_trades {
            pending.pop_front()
        } else {
            None
        }
    }

    //----------------------------------------------------------------------------------------------
    fn handle_canceled_transactions(&mut self, canceled: Vec<Transaction>) {
        if canceled.is_empty() {
            return;
        }
        let timestamp = self.clock.now_ms();
        for mut transaction in canceled {
            warn!(
                "trade {} expired in the pending queue",
                transaction.result.trade_id
            );
            self.state_manager.finalize_with_error(
                &mut transaction,
                TradeErrorCode::LongQueueWait,
                TradeState::OpenError,
                timestamp,
                None,
            );
            self.dispatch_trade_event(&transaction);
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Walks the open set: promotes confirmed opens, times out overdue
    /// settlements and requests resolution for trades past their close date
    fn process_closing_transactions(&mut self) {
        if self.open_transactions.is_empty() {
            return;
        }
        let timestamp = self.clock.now_ms();
        let response_timeout_ms = self.account_info.response_timeout_ms();

        let mut index = 0;
        while index < self.open_transactions.len() {
            let trade_state = self.open_transactions[index].result.trade_state;

            if trade_state == TradeState::OpenSuccess {
                self.dispatch_trade_event(&self.open_transactions[index]);
                let result = &mut self.open_transactions[index].result;
                result.trade_state = TradeState::InProgress;
                result.live_state = TradeState::InProgress;
                index += 1;
                continue;
            }

            if !TradeStateManager::is_closable_state(trade_state) {
                index += 1;
                continue;
            }

            let close_date = TradeStateManager::calculate_close_date(
                &self.open_transactions[index].result,
                &self.open_transactions[index].request,
            );

            if close_date == 0 {
                let mut transaction = self.open_transactions.remove(index);
                transaction.result.error_code =
                    if transaction.request.option_type == OptionType::Sprint {
                        TradeErrorCode::InvalidDuration
                    } else {
                        TradeErrorCode::InvalidExpiryTime
                    };
                self.handle_closing_error(transaction, timestamp);
                continue;
            }

            if timestamp < close_date {
                index += 1;
                continue;
            }

            if timestamp > close_date + response_timeout_ms {
                let mut transaction = self.open_transactions.remove(index);
                transaction.result.error_code = TradeErrorCode::LongResponseWait;
                self.handle_closing_error(transaction, timestamp);
                continue;
            }

            if TradeStateManager::is_transition_to_waiting_close(trade_state) {
                {
                    let result = &mut self.open_transactions[index].result;
                    result.trade_state = TradeState::WaitingClose;
                    result.live_state = TradeState::WaitingClose;
                }
                self.dispatch_trade_event(&self.open_transactions[index]);
                self.hub
                    .notify(&Event::TradeStatus(self.open_transactions[index].clone()));
            }

            index += 1;
        }
    }

    //----------------------------------------------------------------------------------------------
    fn handle_closing_error(&mut self, mut transaction: Transaction, timestamp: i64) {
        error!(
            "trade {} could not be settled: {}",
            transaction.result.trade_id, transaction.result.error_code
        );
        self.decrement_open_trades(&transaction);
        let error_code = transaction.result.error_code;
        self.state_manager.finalize_with_error(
            &mut transaction,
            error_code,
            TradeState::CheckError,
            timestamp,
            None,
        );
        self.dispatch_trade_event(&transaction);
    }

    //----------------------------------------------------------------------------------------------
    /// Removes every open transaction that reached a terminal state
    fn process_finalizing_transactions(&mut self) {
        let mut index = 0;
        while index < self.open_transactions.len() {
            if TradeStateManager::is_terminal_state(self.open_transactions[index].result.trade_state)
            {
                let transaction = self.open_transactions.remove(index);
                self.decrement_open_trades(&transaction);
                self.dispatch_trade_event(&transaction);
            } else {
                index += 1;
            }
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Applies fresh ticks to open trades.  Only the provisional
    /// `live_state` moves here; the authoritative outcome arrives from the
    /// broker through `update_trade`.
    fn handle_price_update(&mut self, ticks: &[TickData]) {
        for index in 0..self.open_transactions.len() {
            let trade_state = self.open_transactions[index].result.trade_state;
            if trade_state != TradeState::OpenSuccess && trade_state != TradeState::InProgress {
                continue;
            }

            if trade_state == TradeState::OpenSuccess {
                self.dispatch_trade_event(&self.open_transactions[index]);
                let result = &mut self.open_transactions[index].result;
                result.live_state = TradeState::InProgress;
                result.trade_state = TradeState::InProgress;
            }

            let tick = match tick_by_symbol(ticks, &self.open_transactions[index].request.symbol) {
                Some(tick) if tick.has_flag(TickStatusFlags::Initialized) => tick.clone(),
                _ => continue,
            };

            let transaction = &mut self.open_transactions[index];
            transaction.result.close_price = tick.mid_price();
            let live_state = TradeStateManager::determine_trade_state(
                &transaction.result,
                &transaction.request,
                &tick,
            );
            transaction.result.live_state = live_state;
            self.dispatch_trade_event(&self.open_transactions[index]);
        }
    }

    //----------------------------------------------------------------------------------------------
    fn increment_open_trades(&mut self, transaction: &Transaction) {
        self.open_trades += 1;
        self.hub.notify(&Event::OpenTrades {
            count: self.open_trades,
            transaction: transaction.clone(),
        });
    }

    //----------------------------------------------------------------------------------------------
    fn decrement_open_trades(&mut self, transaction: &Transaction) {
        if self.open_trades > 0 {
            self.open_trades -= 1;
            self.hub.notify(&Event::OpenTrades {
                count: self.open_trades,
                transaction: transaction.clone(),
            });
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Publishes the transaction, runs its per-request callbacks and the
    /// process-wide result callback.  Every consumer gets its own clones;
    /// the result callback is invoked outside its mutex.
    fn dispatch_trade_event(&self, transaction: &Transaction) {
        self.hub
            .notify(&Event::TradeTransaction(transaction.clone()));
        transaction.request.dispatch_callbacks(&transaction.result);

        let callback = {
            self.shared
                .trade_result_callback
                .lock()
                .expect(POISONED_MUTEX)
                .clone()
        };
        if let Some(callback) = callback {
            callback(transaction.request.clone(), transaction.result.clone());
        }
    }
}

impl EventListener for TradeQueueManager {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::PriceUpdate(ticks) => self.handle_price_update(ticks),
            Event::DisconnectRequest { .. } => self.finalize_all_trades(),
            _ => {}
        }
    }
}
