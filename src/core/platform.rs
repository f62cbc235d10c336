//! Contract between the execution core and broker-specific adapters.  The
//! core calls into a `PlatformAdapter`; the adapter feeds price, account and
//! settlement data back through the event hub and callbacks.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::account::{AccountInfoRequest, AccountInfoUpdate};
use crate::core::candles::CandleInfo;
use crate::core::common::PlatformType;
use crate::core::ticks::TickData;
use crate::core::trade::{TradeRequest, TradeResultCallback};

//==================================================================================================
/// Opaque authorization payload.  The core forwards it to the adapter
/// unchanged; adapters downcast to their own concrete type.
pub trait AuthData: Send + Sync {
    fn platform_type(&self) -> PlatformType;
    fn as_any(&self) -> &dyn Any;
}

//==================================================================================================
/// Result of a connection attempt
#[derive(Clone, Debug, Default)]
pub struct ConnectionResult {
    pub success: bool,
    pub reason: String,
}

impl ConnectionResult {
    pub fn ok() -> Self {
        ConnectionResult {
            success: true,
            reason: String::new(),
        }
    }

    pub fn failed(reason: &str) -> Self {
        ConnectionResult {
            success: false,
            reason: reason.to_string(),
        }
    }
}

pub type ConnectionCallback = Arc<dyn Fn(&ConnectionResult) + Send + Sync>;
pub type DisconnectCallback = Arc<dyn Fn() + Send + Sync>;
pub type AccountInfoCallback = Arc<dyn Fn(&AccountInfoUpdate) + Send + Sync>;
pub type CandleInfoCallback = Arc<dyn Fn(&CandleInfo) + Send + Sync>;
pub type TickInfoCallback = Arc<dyn Fn(&[TickData]) + Send + Sync>;
pub type SymbolsCallback = Arc<dyn Fn(&SymbolsInfo) + Send + Sync>;

//==================================================================================================
/// Static description of a tradable symbol
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SymbolInfo {
    pub symbol: String,
    pub provider: String,
    pub price_digits: u32,
    pub volume_digits: u32,
}

/// Symbol catalog reported by an adapter
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SymbolsInfo {
    pub symbols: Vec<SymbolInfo>,
}

//==================================================================================================
/// A broker integration.  Implementations own all I/O; the engine never
/// blocks and talks to the platform exclusively through this surface and the
/// event hub.
pub trait PlatformAdapter: Send {
    fn platform_type(&self) -> PlatformType;

    //----------------------------------------------------------------------------------------------
    /// Installs authorization data.  Returns false when the payload is not
    /// for this platform.
    fn configure_auth(&mut self, auth: Box<dyn AuthData>) -> bool;

    //----------------------------------------------------------------------------------------------
    /// Starts the connection handshake; the callback reports the outcome.
    fn connect(&mut self, callback: ConnectionCallback);

    //----------------------------------------------------------------------------------------------
    /// Drops the connection.  Live trades are finalized with
    /// `ClientForcedClose` before the callback runs.
    fn disconnect(&mut self, callback: DisconnectCallback);

    //----------------------------------------------------------------------------------------------
    /// Validates and queues a trade for execution
    fn place_trade(&mut self, request: TradeRequest) -> bool;

    //----------------------------------------------------------------------------------------------
    fn set_trade_result_callback(&mut self, callback: TradeResultCallback);

    //----------------------------------------------------------------------------------------------
    fn set_account_info_callback(&mut self, callback: AccountInfoCallback);

    //----------------------------------------------------------------------------------------------
    fn set_candle_info_callback(&mut self, callback: CandleInfoCallback);

    //----------------------------------------------------------------------------------------------
    fn set_tick_info_callback(&mut self, callback: TickInfoCallback);

    //----------------------------------------------------------------------------------------------
    /// Reports the symbol catalog.  Adapters without one report an empty
    /// catalog.
    fn get_symbols(&self, callback: SymbolsCallback) {
        callback(&SymbolsInfo::default());
    }

    //----------------------------------------------------------------------------------------------
    /// Drives the adapter's internal state.  Must be called periodically from
    /// the same thread that drives the executor.
    fn process(&mut self);

    //----------------------------------------------------------------------------------------------
    /// Finalizes all trades and releases resources
    fn shutdown(&mut self);

    //----------------------------------------------------------------------------------------------
    fn get_account_info_bool(&self, request: &AccountInfoRequest) -> bool;
    fn get_account_info_i64(&self, request: &AccountInfoRequest) -> i64;
    fn get_account_info_f64(&self, request: &AccountInfoRequest) -> f64;
    fn get_account_info_str(&self, request: &AccountInfoRequest) -> String;
}

impl fmt::Debug for dyn AuthData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // payloads stay opaque; only the platform tag is safe to print
        write!(f, "AuthData({})", self.platform_type())
    }
}
