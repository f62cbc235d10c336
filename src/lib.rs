/*! Lib implementing the client side of binary-option broker platforms: order
validation, queueing and lifecycle tracking, plus an encrypted store for
authenticated broker sessions.

The main structs that clients will use are **TradeExecutor**, which accepts
trade requests and drives them through their lifecycle, and the
**PlatformAdapter** trait, which broker integrations implement to execute
admitted trades and to feed price and account events back into the engine.

# Example

Build an adapter (the crate ships a simulator), hand it trade requests and
pump `process()` from one thread; terminal outcomes arrive on the trade
result callback.

```no_run
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use optbridge::core::clock::{Clock, SystemClock};
use optbridge::core::platform::PlatformAdapter;
use optbridge::examples::sample_requests;
use optbridge::examples::simulator::SimulatorAdapter;

let clock: Arc<dyn Clock> = Arc::new(SystemClock);
let mut adapter = SimulatorAdapter::new(clock);

adapter.set_trade_result_callback(Arc::new(|request, result| {
    println!("{}: {} ({})", request.symbol, result.trade_state, result.profit);
}));

adapter.connect(Arc::new(|res| println!("connected: {}", res.success)));
adapter.place_trade(sample_requests::sprint_buy("EURUSD", 10.0, 60));

loop {
    adapter.process();
    thread::sleep(Duration::from_millis(10));
}
```
*/
pub mod core;
pub mod examples;

#[cfg(test)]
mod tests;
