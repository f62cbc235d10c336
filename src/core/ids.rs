//! Unique trade identifier service.  Owned by the executor and handed to the
//! queue manager; never a global.
use std::sync::atomic::{AtomicU64, Ordering};

//==================================================================================================
/// Generates process-unique trade identifiers, starting at 1
#[derive(Debug)]
pub struct TradeIdGenerator {
    current_id: AtomicU64,
}

impl TradeIdGenerator {
    pub fn new() -> Self {
        TradeIdGenerator {
            current_id: AtomicU64::new(1),
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Returns the next identifier.  Never returns the same value twice within
    /// a process lifetime.
    pub fn next_id(&self) -> u64 {
        self.current_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for TradeIdGenerator {
    fn default() -> Self {
        TradeIdGenerator::new()
    }
}
