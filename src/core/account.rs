//! Typed, time-parameterized read interface over account and platform state.
//! The adapter supplies the data behind the `AccountInfoData` trait; the
//! engine only ever reads through `AccountInfoProvider`.
use std::fmt;
use std::sync::Arc;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::core::clock::sec_to_ms;
use crate::core::common::{AccountType, CurrencyType, OptionType, OrderType};
use crate::core::trade::TradeRequest;

//==================================================================================================
/// Query tags understood by `AccountInfoData` implementations
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum AccountInfoType {
    #[default]
    Unknown = 0,
    PlatformType = 1,
    AccountType = 2,
    Currency = 3,
    ConnectionStatus = 4,
    Balance = 5,
    MinAmount = 6,
    MaxAmount = 7,
    MinDuration = 8,
    MaxDuration = 9,
    StartTime = 10,
    EndTime = 11,
    Payout = 12,
    MinPayout = 13,
    MaxRefund = 14,
    MinRefund = 15,
    OpenTrades = 16,
    MaxTrades = 17,
    TradeLimitNotExceeded = 18,
    AmountBelowMax = 19,
    AmountAboveMin = 20,
    RefundBelowMax = 21,
    RefundAboveMin = 22,
    DurationAvailable = 23,
    ExpirationDateAvailable = 24,
    PayoutAboveMin = 25,
    AmountBelowBalance = 26,
    SymbolAvailable = 27,
    OptionTypeAvailable = 28,
    OrderTypeAvailable = 29,
    AccountTypeAvailable = 30,
    CurrencyAvailable = 31,
    /// Max post-close wait for settlement, seconds
    ResponseTimeout = 32,
    /// Pending-queue max wait, seconds
    OrderQueueTimeout = 33,
    /// Minimum gap between admissions, milliseconds
    OrderIntervalMs = 34,
}

impl fmt::Display for AccountInfoType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{:?}", self)
    }
}

//==================================================================================================
/// A tagged query into account state.  Trade-contextual fields are filled in
/// by the `for_*` constructors; `timestamp` of 0 means "current".
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountInfoRequest {
    pub info_type: AccountInfoType,
    pub symbol: String,
    pub option_type: OptionType,
    pub order_type: OrderType,
    pub account_type: AccountType,
    pub currency: CurrencyType,
    pub amount: f64,
    pub refund: f64,
    pub min_payout: f64,
    pub duration: i64,
    pub expiry_time: i64,
    /// Unix seconds; 0 = current
    pub timestamp: i64,
}

impl AccountInfoRequest {
    pub fn new(info_type: AccountInfoType, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type,
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn for_symbol(symbol: &str, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type: AccountInfoType::SymbolAvailable,
            symbol: symbol.to_string(),
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn for_option(option_type: OptionType, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type: AccountInfoType::OptionTypeAvailable,
            option_type,
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn for_order(order_type: OrderType, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type: AccountInfoType::OrderTypeAvailable,
            order_type,
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn for_account(account_type: AccountType, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type: AccountInfoType::AccountTypeAvailable,
            account_type,
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn for_currency(currency: CurrencyType, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type: AccountInfoType::CurrencyAvailable,
            currency,
            timestamp,
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Copies the full trade context so implementations can answer
    /// per-request queries (payout for this symbol/duration/amount, limits).
    pub fn for_trade(info_type: AccountInfoType, request: &TradeRequest, timestamp: i64) -> Self {
        AccountInfoRequest {
            info_type,
            symbol: request.symbol.clone(),
            option_type: request.option_type,
            order_type: request.order_type,
            account_type: request.account_type,
            currency: request.currency,
            amount: request.amount,
            refund: request.refund,
            min_payout: request.min_payout,
            duration: request.duration,
            expiry_time: request.expiry_time,
            timestamp,
        }
    }
}

//==================================================================================================
/// Account-state capability supplied by the platform adapter
pub trait AccountInfoData: Send + Sync {
    fn get_info_bool(&self, request: &AccountInfoRequest) -> bool;
    fn get_info_i64(&self, request: &AccountInfoRequest) -> i64;
    fn get_info_f64(&self, request: &AccountInfoRequest) -> f64;
    fn get_info_str(&self, request: &AccountInfoRequest) -> String;
}

//==================================================================================================
/// Status attached to an account info update event
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum AccountUpdateStatus {
    #[default]
    Unknown = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
    BalanceUpdated = 4,
    AccountSwitched = 5,
}

/// Account info update payload delivered by adapters
#[derive(Clone)]
pub struct AccountInfoUpdate {
    pub info: Arc<dyn AccountInfoData>,
    pub status: AccountUpdateStatus,
    pub message: String,
}

impl fmt::Debug for AccountInfoUpdate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccountInfoUpdate")
            .field("status", &self.status)
            .field("message", &self.message)
            .finish()
    }
}

//==================================================================================================
/// Read-through projection of account and platform state.  Cheap to clone;
/// all readers share the adapter-supplied `AccountInfoData`.
#[derive(Clone)]
pub struct AccountInfoProvider {
    data: Arc<dyn AccountInfoData>,
}

impl AccountInfoProvider {
    pub fn new(data: Arc<dyn AccountInfoData>) -> Self {
        AccountInfoProvider { data }
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_bool(&self, info_type: AccountInfoType, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::new(info_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_i64(&self, info_type: AccountInfoType, timestamp: i64) -> i64 {
        self.data
            .get_info_i64(&AccountInfoRequest::new(info_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_f64(&self, info_type: AccountInfoType, timestamp: i64) -> f64 {
        self.data
            .get_info_f64(&AccountInfoRequest::new(info_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_str(&self, info_type: AccountInfoType, timestamp: i64) -> String {
        self.data
            .get_info_str(&AccountInfoRequest::new(info_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_by_symbol(&self, symbol: &str, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_symbol(symbol, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_by_option(&self, option_type: OptionType, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_option(option_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_by_order(&self, order_type: OrderType, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_order(order_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_by_account(&self, account_type: AccountType, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_account(account_type, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_by_currency(&self, currency: CurrencyType, timestamp: i64) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_currency(currency, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_for_trade_bool(
        &self,
        info_type: AccountInfoType,
        request: &TradeRequest,
        timestamp: i64,
    ) -> bool {
        self.data
            .get_info_bool(&AccountInfoRequest::for_trade(info_type, request, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_for_trade_i64(
        &self,
        info_type: AccountInfoType,
        request: &TradeRequest,
        timestamp: i64,
    ) -> i64 {
        self.data
            .get_info_i64(&AccountInfoRequest::for_trade(info_type, request, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    pub fn get_for_trade_f64(
        &self,
        info_type: AccountInfoType,
        request: &TradeRequest,
        timestamp: i64,
    ) -> f64 {
        self.data
            .get_info_f64(&AccountInfoRequest::for_trade(info_type, request, timestamp))
    }

    //----------------------------------------------------------------------------------------------
    /// Current account type as reported by the adapter
    pub fn account_type(&self, timestamp: i64) -> AccountType {
        AccountType::from_i64(self.get_i64(AccountInfoType::AccountType, timestamp))
            .unwrap_or(AccountType::Unknown)
    }

    //----------------------------------------------------------------------------------------------
    /// Current account currency as reported by the adapter
    pub fn currency(&self, timestamp: i64) -> CurrencyType {
        CurrencyType::from_i64(self.get_i64(AccountInfoType::Currency, timestamp))
            .unwrap_or(CurrencyType::Unknown)
    }

    //----------------------------------------------------------------------------------------------
    /// Max post-close wait for settlement, converted to milliseconds
    pub fn response_timeout_ms(&self) -> i64 {
        sec_to_ms(self.get_i64(AccountInfoType::ResponseTimeout, 0))
    }
}
