//! Trade state rules: request validation, outcome determination, close-time
//! arithmetic and error finalization.  Everything here is side-effect free
//! apart from the fields it is asked to stamp.
use std::sync::Arc;

use log::*;

use crate::core::account::{AccountInfoProvider, AccountInfoType};
use crate::core::clock::{ms_to_sec, sec_to_ms, Clock};
use crate::core::common::{OptionType, OrderType};
use crate::core::ticks::TickData;
use crate::core::trade::{TradeErrorCode, TradeRequest, TradeResult, TradeState, Transaction};

//==================================================================================================
/// Validation and progression rules, parameterized by account state
pub struct TradeStateManager {
    account_info: AccountInfoProvider,
    clock: Arc<dyn Clock>,
}

impl TradeStateManager {
    pub fn new(account_info: AccountInfoProvider, clock: Arc<dyn Clock>) -> Self {
        TradeStateManager {
            account_info,
            clock,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Runs the admission predicates in order and returns the first failure.
    pub fn validate_request(&self, request: &TradeRequest) -> TradeErrorCode {
        if request.symbol.is_empty() {
            return TradeErrorCode::InvalidSymbol;
        }
        let timestamp = ms_to_sec(self.clock.now_ms());
        let info = &self.account_info;

        if !info.get_bool(AccountInfoType::ConnectionStatus, 0) {
            return TradeErrorCode::NoConnection;
        }
        if !info.get_by_symbol(&request.symbol, timestamp) {
            return TradeErrorCode::InvalidSymbol;
        }
        if !info.get_by_option(request.option_type, timestamp) {
            return TradeErrorCode::InvalidOption;
        }
        if !info.get_by_order(request.order_type, timestamp) {
            return TradeErrorCode::InvalidOrder;
        }
        if !info.get_by_account(request.account_type, timestamp) {
            return TradeErrorCode::InvalidAccount;
        }
        if !info.get_by_currency(request.currency, timestamp) {
            return TradeErrorCode::InvalidCurrency;
        }
        if !info.get_for_trade_bool(AccountInfoType::TradeLimitNotExceeded, request, timestamp) {
            return TradeErrorCode::LimitOpenTrades;
        }
        if !info.get_for_trade_bool(AccountInfoType::AmountBelowMax, request, timestamp) {
            return TradeErrorCode::AmountTooHigh;
        }
        if !info.get_for_trade_bool(AccountInfoType::AmountAboveMin, request, timestamp) {
            return TradeErrorCode::AmountTooLow;
        }
        if !info.get_for_trade_bool(AccountInfoType::RefundBelowMax, request, timestamp) {
            return TradeErrorCode::RefundTooHigh;
        }
        if !info.get_for_trade_bool(AccountInfoType::RefundAboveMin, request, timestamp) {
            return TradeErrorCode::RefundTooLow;
        }
        if !info.get_for_trade_bool(AccountInfoType::DurationAvailable, request, timestamp) {
            return TradeErrorCode::InvalidDuration;
        }
        if !info.get_for_trade_bool(AccountInfoType::ExpirationDateAvailable, request, timestamp) {
            return TradeErrorCode::InvalidExpiryTime;
        }
        if !info.get_for_trade_bool(AccountInfoType::PayoutAboveMin, request, timestamp) {
            return TradeErrorCode::PayoutTooLow;
        }
        if !info.get_for_trade_bool(AccountInfoType::AmountBelowBalance, request, timestamp) {
            return TradeErrorCode::InsufficientBalance;
        }

        TradeErrorCode::Success
    }

    //----------------------------------------------------------------------------------------------
    /// Provisional win/loss/standoff against the latest tick.  A trade with
    /// no recorded open price is a standoff.
    pub fn determine_trade_state(
        result: &TradeResult,
        request: &TradeRequest,
        tick: &TickData,
    ) -> TradeState {
        if result.open_price == 0.0 {
            return TradeState::Standoff;
        }

        let mid_price = tick.mid_price();
        match request.order_type {
            OrderType::Buy => {
                if mid_price > result.open_price {
                    TradeState::Win
                } else if mid_price < result.open_price {
                    TradeState::Loss
                } else {
                    TradeState::Standoff
                }
            }
            OrderType::Sell => {
                if mid_price < result.open_price {
                    TradeState::Win
                } else if mid_price > result.open_price {
                    TradeState::Loss
                } else {
                    TradeState::Standoff
                }
            }
            _ => TradeState::Standoff,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// States from which a trade can still be driven toward settlement
    pub fn is_closable_state(state: TradeState) -> bool {
        state == TradeState::WaitingClose
            || state == TradeState::OpenSuccess
            || state == TradeState::InProgress
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_transition_to_waiting_close(state: TradeState) -> bool {
        state == TradeState::OpenSuccess || state == TradeState::InProgress
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_terminal_state(state: TradeState) -> bool {
        state == TradeState::OpenError
            || state == TradeState::CheckError
            || state == TradeState::Win
            || state == TradeState::Loss
            || state == TradeState::Standoff
            || state == TradeState::Refund
    }

    //----------------------------------------------------------------------------------------------
    /// Expected settlement timestamp in milliseconds; 0 means the trade
    /// carries no computable close time.
    pub fn calculate_close_date(result: &TradeResult, request: &TradeRequest) -> i64 {
        if result.close_date > 0 {
            return result.close_date;
        }
        match request.option_type {
            OptionType::Sprint => {
                if result.open_date > 0 {
                    result.open_date + sec_to_ms(request.duration)
                } else {
                    result.place_date + sec_to_ms(request.duration)
                }
            }
            OptionType::Classic => sec_to_ms(request.expiry_time),
            _ => 0,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Stamps a terminal error onto the transaction: timeline collapsed to
    /// `timestamp`, latest balance/payout recorded, both states set.
    pub fn finalize_with_error(
        &self,
        transaction: &mut Transaction,
        error_code: TradeErrorCode,
        state: TradeState,
        timestamp: i64,
        error_desc: Option<&str>,
    ) {
        let result = &mut transaction.result;
        result.error_code = error_code;
        result.error_desc = match error_desc {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => error_code.message().to_string(),
        };
        result.send_date = timestamp;
        result.open_date = timestamp;
        result.close_date = timestamp;
        result.balance =
            self.account_info
                .get_for_trade_f64(AccountInfoType::Balance, &transaction.request, timestamp);
        result.payout =
            self.account_info
                .get_for_trade_f64(AccountInfoType::Payout, &transaction.request, timestamp);
        result.trade_state = state;
        result.live_state = state;
        trace!(
            "trade {} finalized: {:?} ({})",
            result.trade_id,
            state,
            error_code
        );
    }
}
