//! Common types
use std::fmt;

use num_derive::FromPrimitive;

use serde::{Deserialize, Serialize};

pub const NO_VALID_ID: i64 = -1;

pub const UNSET_INTEGER: i32 = std::i32::MAX;
pub const UNSET_DOUBLE: f64 = 1.7976931348623157E308_f64;
pub const UNSET_LONG: i64 = std::i64::MAX;

pub(crate) static POISONED_MUTEX: &str = "Mutex was poisoned";

//==================================================================================================
/// Trading platform the engine is bridged to
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum PlatformType {
    #[default]
    Unknown = 0,
    Simulator = 1,
    Clicker = 2,
    IntradeBar = 3,
    TradeUp = 4,
}

impl fmt::Display for PlatformType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PlatformType::Unknown => write!(fmt, "UNKNOWN"),
            PlatformType::Simulator => write!(fmt, "SIMULATOR"),
            PlatformType::Clicker => write!(fmt, "CLICKER"),
            PlatformType::IntradeBar => write!(fmt, "INTRADE_BAR"),
            PlatformType::TradeUp => write!(fmt, "TRADEUP"),
        }
    }
}

impl PlatformType {
    pub fn from_name(name: &str) -> Option<PlatformType> {
        match name.to_uppercase().as_str() {
            "UNKNOWN" => Some(PlatformType::Unknown),
            "SIMULATOR" => Some(PlatformType::Simulator),
            "CLICKER" => Some(PlatformType::Clicker),
            "INTRADE_BAR" => Some(PlatformType::IntradeBar),
            "TRADEUP" => Some(PlatformType::TradeUp),
            _ => None,
        }
    }
}

//==================================================================================================
/// Account type (demo/real)
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[default]
    Unknown = 0,
    Demo = 1,
    Real = 2,
}

impl fmt::Display for AccountType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AccountType::Unknown => write!(fmt, "UNKNOWN"),
            AccountType::Demo => write!(fmt, "DEMO"),
            AccountType::Real => write!(fmt, "REAL"),
        }
    }
}

impl AccountType {
    pub fn from_name(name: &str) -> Option<AccountType> {
        match name.to_uppercase().as_str() {
            "UNKNOWN" => Some(AccountType::Unknown),
            "DEMO" => Some(AccountType::Demo),
            "REAL" => Some(AccountType::Real),
            _ => None,
        }
    }
}

//==================================================================================================
/// Binary option flavor.  Sprint options settle a fixed duration after opening,
/// classic options settle at a preset wall-clock expiry.
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum OptionType {
    #[default]
    Unknown = 0,
    Sprint = 1,
    Classic = 2,
}

impl fmt::Display for OptionType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            OptionType::Unknown => write!(fmt, "UNKNOWN"),
            OptionType::Sprint => write!(fmt, "SPRINT"),
            OptionType::Classic => write!(fmt, "CLASSIC"),
        }
    }
}

impl OptionType {
    pub fn from_name(name: &str) -> Option<OptionType> {
        match name.to_uppercase().as_str() {
            "UNKNOWN" => Some(OptionType::Unknown),
            "SPRINT" => Some(OptionType::Sprint),
            "CLASSIC" => Some(OptionType::Classic),
            _ => None,
        }
    }
}

//==================================================================================================
/// Trade direction
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    Unknown = 0,
    Buy = 1,
    Sell = 2,
}

impl fmt::Display for OrderType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            OrderType::Unknown => write!(fmt, "UNKNOWN"),
            OrderType::Buy => write!(fmt, "BUY"),
            OrderType::Sell => write!(fmt, "SELL"),
        }
    }
}

impl OrderType {
    pub fn from_name(name: &str) -> Option<OrderType> {
        match name.to_uppercase().as_str() {
            "UNKNOWN" => Some(OrderType::Unknown),
            "BUY" => Some(OrderType::Buy),
            "SELL" => Some(OrderType::Sell),
            _ => None,
        }
    }
}

//==================================================================================================
/// Account currency
#[allow(clippy::upper_case_acronyms)]
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum CurrencyType {
    #[default]
    Unknown = 0,
    USD = 1,
    EUR = 2,
    GBP = 3,
    BTC = 4,
    ETH = 5,
    USDT = 6,
    USDC = 7,
    RUB = 8,
    UAH = 9,
    KZT = 10,
}

impl fmt::Display for CurrencyType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CurrencyType::Unknown => write!(fmt, "UNKNOWN"),
            CurrencyType::USD => write!(fmt, "USD"),
            CurrencyType::EUR => write!(fmt, "EUR"),
            CurrencyType::GBP => write!(fmt, "GBP"),
            CurrencyType::BTC => write!(fmt, "BTC"),
            CurrencyType::ETH => write!(fmt, "ETH"),
            CurrencyType::USDT => write!(fmt, "USDT"),
            CurrencyType::USDC => write!(fmt, "USDC"),
            CurrencyType::RUB => write!(fmt, "RUB"),
            CurrencyType::UAH => write!(fmt, "UAH"),
            CurrencyType::KZT => write!(fmt, "KZT"),
        }
    }
}

impl CurrencyType {
    pub fn from_name(name: &str) -> Option<CurrencyType> {
        match name.to_uppercase().as_str() {
            "UNKNOWN" => Some(CurrencyType::Unknown),
            "USD" => Some(CurrencyType::USD),
            "EUR" => Some(CurrencyType::EUR),
            "GBP" => Some(CurrencyType::GBP),
            "BTC" => Some(CurrencyType::BTC),
            "ETH" => Some(CurrencyType::ETH),
            "USDT" => Some(CurrencyType::USDT),
            "USDC" => Some(CurrencyType::USDC),
            "RUB" => Some(CurrencyType::RUB),
            "UAH" => Some(CurrencyType::UAH),
            "KZT" => Some(CurrencyType::KZT),
            _ => None,
        }
    }
}

//==================================================================================================
/// Adapter connection status
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConnectionStatus::Disconnected => write!(fmt, "DISCONNECTED"),
            ConnectionStatus::Connecting => write!(fmt, "CONNECTING"),
            ConnectionStatus::Connected => write!(fmt, "CONNECTED"),
        }
    }
}

//==================================================================================================
/// State change reported alongside a bridge status update
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum BridgeStatus {
    #[default]
    Unknown = 0,
    ServerStarted = 1,
    ServerStopped = 2,
    ServerStartFailed = 3,
    ClientConnected = 4,
    ClientDisconnected = 5,
    ConnectionError = 6,
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BridgeStatus::Unknown => write!(fmt, "UNKNOWN"),
            BridgeStatus::ServerStarted => write!(fmt, "SERVER_STARTED"),
            BridgeStatus::ServerStopped => write!(fmt, "SERVER_STOPPED"),
            BridgeStatus::ServerStartFailed => write!(fmt, "SERVER_START_FAILED"),
            BridgeStatus::ClientConnected => write!(fmt, "CLIENT_CONNECTED"),
            BridgeStatus::ClientDisconnected => write!(fmt, "CLIENT_DISCONNECTED"),
            BridgeStatus::ConnectionError => write!(fmt, "CONNECTION_ERROR"),
        }
    }
}

//==================================================================================================
/// Bridge status update pushed by adapters that front a local bridge server
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BridgeStatusUpdate {
    pub status: BridgeStatus,
    pub connection_id: String,
    pub message: String,
}

impl BridgeStatusUpdate {
    pub fn new(status: BridgeStatus, connection_id: &str, message: &str) -> Self {
        BridgeStatusUpdate {
            status,
            connection_id: connection_id.to_string(),
            message: message.to_string(),
        }
    }
}

//==================================================================================================
/// Tag identifying a money-management parameter block
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Debug, FromPrimitive, Copy, PartialEq, Eq, Default)]
pub enum MmSystemType {
    #[default]
    None = 0,
    FixedAmount = 1,
    BalancePercent = 2,
    Custom = 3,
}

impl fmt::Display for MmSystemType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MmSystemType::None => write!(fmt, "NONE"),
            MmSystemType::FixedAmount => write!(fmt, "FIXED_AMOUNT"),
            MmSystemType::BalancePercent => write!(fmt, "BALANCE_PERCENT"),
            MmSystemType::Custom => write!(fmt, "CUSTOM"),
        }
    }
}
