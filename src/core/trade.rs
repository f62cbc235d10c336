//! Trade data model: requests, results, lifecycle states and error codes.
use std::fmt;
use std::sync::Arc;

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::core::common::{AccountType, CurrencyType, MmSystemType, OptionType, OrderType, PlatformType};

/// Callback invoked with cloned request/result pairs whenever a trade's state
/// is dispatched.
pub type TradeResultCallback = Arc<dyn Fn(TradeRequest, TradeResult) + Send + Sync>;

//==================================================================================================
/// Trade lifecycle states
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum TradeState {
    #[default]
    Unknown = 0,
    /// Admitted, waiting for the broker to confirm the open
    WaitingOpen = 1,
    /// Broker confirmed the position is open
    OpenSuccess = 2,
    /// Broker rejected the order, or it never left the queue
    OpenError = 3,
    /// Position is live and tracked against ticks
    InProgress = 4,
    /// Past the close date, waiting for the broker's settlement
    WaitingClose = 5,
    /// Settlement never arrived or could not be computed
    CheckError = 6,
    Win = 7,
    Loss = 8,
    /// Draw: close price equals open price
    Standoff = 9,
    Refund = 10,
    CanceledTrade = 11,
}

impl fmt::Display for TradeState {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TradeState::Unknown => write!(fmt, "UNKNOWN"),
            TradeState::WaitingOpen => write!(fmt, "WAITING_OPEN"),
            TradeState::OpenSuccess => write!(fmt, "OPEN_SUCCESS"),
            TradeState::OpenError => write!(fmt, "OPEN_ERROR"),
            TradeState::InProgress => write!(fmt, "IN_PROGRESS"),
            TradeState::WaitingClose => write!(fmt, "WAITING_CLOSE"),
            TradeState::CheckError => write!(fmt, "CHECK_ERROR"),
            TradeState::Win => write!(fmt, "WIN"),
            TradeState::Loss => write!(fmt, "LOSS"),
            TradeState::Standoff => write!(fmt, "STANDOFF"),
            TradeState::Refund => write!(fmt, "REFUND"),
            TradeState::CanceledTrade => write!(fmt, "CANCELED_TRADE"),
        }
    }
}

//==================================================================================================
/// Outcome codes carried on every trade result
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum TradeErrorCode {
    #[default]
    Success = 0,
    InvalidSymbol = 1,
    InvalidOption = 2,
    InvalidOrder = 3,
    InvalidAccount = 4,
    InvalidCurrency = 5,
    AmountTooLow = 6,
    AmountTooHigh = 7,
    RefundTooLow = 8,
    RefundTooHigh = 9,
    PayoutTooLow = 10,
    InvalidDuration = 11,
    InvalidExpiryTime = 12,
    LimitOpenTrades = 13,
    InvalidRequest = 14,
    LongQueueWait = 15,
    LongResponseWait = 16,
    NoConnection = 17,
    ClientForcedClose = 18,
    ParsingError = 19,
    CanceledTrade = 20,
    InsufficientBalance = 21,
}

impl TradeErrorCode {
    /// Human-readable description, used as the default `error_desc`
    pub fn message(&self) -> &'static str {
        match *self {
            TradeErrorCode::Success => "Success",
            TradeErrorCode::InvalidSymbol => "Invalid trading symbol",
            TradeErrorCode::InvalidOption => "Invalid option type",
            TradeErrorCode::InvalidOrder => "Invalid order type",
            TradeErrorCode::InvalidAccount => "Invalid account type",
            TradeErrorCode::InvalidCurrency => "Invalid currency",
            TradeErrorCode::AmountTooLow => "Amount below the minimum",
            TradeErrorCode::AmountTooHigh => "Amount above the maximum",
            TradeErrorCode::RefundTooLow => "Refund below the minimum",
            TradeErrorCode::RefundTooHigh => "Refund above the maximum",
            TradeErrorCode::PayoutTooLow => "Payout below the requested minimum",
            TradeErrorCode::InvalidDuration => "Invalid trade duration",
            TradeErrorCode::InvalidExpiryTime => "Invalid expiration time",
            TradeErrorCode::LimitOpenTrades => "Open trades limit reached",
            TradeErrorCode::InvalidRequest => "Malformed trade request",
            TradeErrorCode::LongQueueWait => "Queue wait timeout",
            TradeErrorCode::LongResponseWait => "Server response timeout",
            TradeErrorCode::NoConnection => "Network connection lost",
            TradeErrorCode::ClientForcedClose => "Closed by the client",
            TradeErrorCode::ParsingError => "Data parsing error",
            TradeErrorCode::CanceledTrade => "Trade canceled",
            TradeErrorCode::InsufficientBalance => "Not enough funds",
        }
    }
}

impl fmt::Display for TradeErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.message())
    }
}

//==================================================================================================
/// Money-management parameter block.  Opaque to the engine: it is cloned and
/// forwarded, never interpreted.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub enum MoneyManagement {
    #[default]
    None,
    FixedAmount {
        amount: f64,
    },
    BalancePercent {
        percent: f64,
    },
    Custom {
        tag: String,
        payload: String,
    },
}

impl MoneyManagement {
    pub fn system_type(&self) -> MmSystemType {
        match self {
            MoneyManagement::None => MmSystemType::None,
            MoneyManagement::FixedAmount { .. } => MmSystemType::FixedAmount,
            MoneyManagement::BalancePercent { .. } => MmSystemType::BalancePercent,
            MoneyManagement::Custom { .. } => MmSystemType::Custom,
        }
    }
}

//==================================================================================================
/// A trade order as supplied by application code.  Immutable once admitted;
/// the engine always hands clones to external callbacks.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct TradeRequest {
    /// Trading symbol (e.g. "EURUSD")
    pub symbol: String,
    /// Identifier of the strategy or signal that produced the order
    pub signal_name: String,
    /// User-defined metadata attached to the request
    pub user_data: String,
    pub comment: String,
    /// Deduplication key
    pub unique_hash: String,

    pub unique_id: u64,
    pub account_id: u64,

    pub option_type: OptionType,
    pub order_type: OrderType,
    pub account_type: AccountType,
    pub currency: CurrencyType,

    /// Trade amount in the account currency
    pub amount: f64,
    /// Refund fraction (0.0-1.0) returned on loss
    pub refund: f64,
    /// Minimum acceptable payout fraction
    pub min_payout: f64,

    /// Sprint duration in seconds
    pub duration: i64,
    /// Classic expiry as a Unix timestamp in seconds
    pub expiry_time: i64,

    #[serde(skip)]
    pub(crate) callbacks: Vec<TradeResultCallback>,
}

impl TradeRequest {
    pub fn new(symbol: &str) -> Self {
        TradeRequest {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Registers a completion callback.  Callbacks fire on every dispatch of
    /// this trade, each receiving its own clone of request and result.
    pub fn add_callback(&mut self, callback: TradeResultCallback) {
        self.callbacks.push(callback);
    }

    //----------------------------------------------------------------------------------------------
    pub fn dispatch_callbacks(&self, result: &TradeResult) {
        for callback in &self.callbacks {
            callback(self.clone(), result.clone());
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Builds the result companion with the request's account context copied
    /// over.
    pub fn create_trade_result(&self) -> TradeResult {
        TradeResult {
            account_type: self.account_type,
            currency: self.currency,
            amount: self.amount,
            ..Default::default()
        }
    }
}

impl fmt::Debug for TradeRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TradeRequest")
            .field("symbol", &self.symbol)
            .field("signal_name", &self.signal_name)
            .field("unique_hash", &self.unique_hash)
            .field("unique_id", &self.unique_id)
            .field("account_id", &self.account_id)
            .field("option_type", &self.option_type)
            .field("order_type", &self.order_type)
            .field("account_type", &self.account_type)
            .field("currency", &self.currency)
            .field("amount", &self.amount)
            .field("refund", &self.refund)
            .field("min_payout", &self.min_payout)
            .field("duration", &self.duration)
            .field("expiry_time", &self.expiry_time)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

//==================================================================================================
/// The evolving outcome companion to a trade request
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TradeResult {
    /// Engine-assigned identifier, unique within the process lifetime
    pub trade_id: u64,

    pub error_code: TradeErrorCode,
    pub error_desc: String,

    /// Broker-assigned order identifiers, late-bound
    pub option_hash: String,
    pub option_id: i64,

    pub amount: f64,
    /// Payout fraction (0.0-1.0)
    pub payout: f64,
    pub profit: f64,
    pub balance: f64,

    pub open_price: f64,
    pub close_price: f64,

    /// Order processing delay in milliseconds
    pub delay: i64,
    /// Network latency measurement in milliseconds
    pub ping: i64,
    /// Timeline, milliseconds since epoch
    pub place_date: i64,
    pub send_date: i64,
    pub open_date: i64,
    pub close_date: i64,

    /// Authoritative lifecycle state
    pub trade_state: TradeState,
    /// Provisional tick-driven state; never authoritative
    pub live_state: TradeState,

    pub account_type: AccountType,
    pub currency: CurrencyType,
    pub platform_type: PlatformType,
}

//==================================================================================================
/// A request together with its result, owned as one value.  Crossing the API
/// boundary always clones; the stable `trade_id` is the external identity.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Transaction {
    pub request: TradeRequest,
    pub result: TradeResult,
}

impl Transaction {
    pub fn new(request: TradeRequest, result: TradeResult) -> Self {
        Transaction { request, result }
    }
}

//==================================================================================================
/// A trade request paired with strategy parameters.  The engine forwards the
/// request and ignores the parameters.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TradeSignal {
    pub request: TradeRequest,
    pub money_management: MoneyManagement,
}

impl TradeSignal {
    pub fn new(request: TradeRequest) -> Self {
        TradeSignal {
            request,
            money_management: MoneyManagement::None,
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_money_management(&mut self, params: MoneyManagement) {
        self.money_management = params;
    }

    //----------------------------------------------------------------------------------------------
    pub fn mm_type(&self) -> MmSystemType {
        self.money_management.system_type()
    }
}
