//! Candle payloads forwarded through the adapter's candle callback.  The
//! engine never interprets these; they exist so strategy code can subscribe
//! to history without a second channel.
use serde::{Deserialize, Serialize};

//==================================================================================================
/// A single OHLCV bar
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Bar open timestamp in milliseconds
    pub time_ms: i64,
}

//==================================================================================================
/// A series of bars for one symbol
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CandleInfo {
    pub symbol: String,
    /// Bar period in seconds
    pub period_s: i64,
    pub bars: Vec<Bar>,
}

impl CandleInfo {
    pub fn new(symbol: &str, period_s: i64) -> Self {
        CandleInfo {
            symbol: symbol.to_string(),
            period_s,
            bars: Vec::new(),
        }
    }
}
