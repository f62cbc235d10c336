//! Market tick types
use serde::{Deserialize, Serialize};

//==================================================================================================
/// Flags describing the status of tick data
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatusFlags {
    None = 0,
    /// Data received in real time
    Realtime = 1 << 0,
    /// Data has been initialized; a tick may drive trade state only with this
    /// flag set
    Initialized = 1 << 1,
}

//--------------------------------------------------------------------------------------------------
pub fn has_flag(flags: u32, flag: TickStatusFlags) -> bool {
    (flags & flag as u32) != 0
}

pub fn set_flag(flags: u32, flag: TickStatusFlags) -> u32 {
    flags | flag as u32
}

pub fn clear_flag(flags: u32, flag: TickStatusFlags) -> u32 {
    flags & !(flag as u32)
}

//--------------------------------------------------------------------------------------------------
/// Rounds a price to the given number of decimal places
pub fn normalize_double(value: f64, digits: u32) -> f64 {
    let factor = 10_f64.powi(digits as i32);
    (value * factor).round() / factor
}

//==================================================================================================
/// A single market tick
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    pub ask: f64,
    pub bid: f64,
    pub volume: f64,
    /// Tick timestamp in milliseconds
    pub time_ms: u64,
    /// Time the tick was received from the server
    pub received_ms: u64,
    pub flags: u32,
}

impl Tick {
    pub fn new(ask: f64, bid: f64, volume: f64, time_ms: u64, received_ms: u64, flags: u32) -> Self {
        Tick {
            ask,
            bid,
            volume,
            time_ms,
            received_ms,
            flags,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Average of bid and ask
    pub fn mid_price(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_flag(&mut self, flag: TickStatusFlags) {
        self.flags = set_flag(self.flags, flag);
    }

    //----------------------------------------------------------------------------------------------
    pub fn has_flag(&self, flag: TickStatusFlags) -> bool {
        has_flag(self.flags, flag)
    }
}

//==================================================================================================
/// A market tick together with instrument metadata
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TickData {
    pub tick: Tick,
    pub symbol: String,
    pub provider: String,
    /// Number of decimal places for price
    pub price_digits: u32,
    /// Number of decimal places for volume
    pub volume_digits: u32,
    pub flags: u32,
}

impl TickData {
    pub fn new(
        tick: Tick,
        symbol: &str,
        provider: &str,
        price_digits: u32,
        volume_digits: u32,
        flags: u32,
    ) -> Self {
        TickData {
            tick,
            symbol: symbol.to_string(),
            provider: provider.to_string(),
            price_digits,
            volume_digits,
            flags,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Mid price normalized to the instrument's price precision
    pub fn mid_price(&self) -> f64 {
        normalize_double(self.tick.mid_price(), self.price_digits)
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_flag(&mut self, flag: TickStatusFlags) {
        self.flags = set_flag(self.flags, flag);
    }

    //----------------------------------------------------------------------------------------------
    pub fn has_flag(&self, flag: TickStatusFlags) -> bool {
        has_flag(self.flags, flag)
    }
}
