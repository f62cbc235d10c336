//! Canned trade requests
use crate::core::common::{OptionType, OrderType};
use crate::core::trade::TradeRequest;

//--------------------------------------------------------------------------------------------------
/// Sprint buy: fixed-duration option betting on a rising price
pub fn sprint_buy(symbol: &str, amount: f64, duration_s: i64) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        signal_name: "manual".to_string(),
        option_type: OptionType::Sprint,
        order_type: OrderType::Buy,
        amount,
        duration: duration_s,
        ..Default::default()
    }
}

//--------------------------------------------------------------------------------------------------
/// Sprint sell: fixed-duration option betting on a falling price
pub fn sprint_sell(symbol: &str, amount: f64, duration_s: i64) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        signal_name: "manual".to_string(),
        option_type: OptionType::Sprint,
        order_type: OrderType::Sell,
        amount,
        duration: duration_s,
        ..Default::default()
    }
}

//--------------------------------------------------------------------------------------------------
/// Classic buy settling at an absolute expiry (Unix seconds)
pub fn classic_buy(symbol: &str, amount: f64, expiry_time_s: i64) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        signal_name: "manual".to_string(),
        option_type: OptionType::Classic,
        order_type: OrderType::Buy,
        amount,
        expiry_time: expiry_time_s,
        ..Default::default()
    }
}
