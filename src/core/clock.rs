//! Time source used by the engine.  All deadline arithmetic goes through the
//! Clock trait so tests can drive the engine with a simulated wall clock.
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Milliseconds-since-epoch time source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

//--------------------------------------------------------------------------------------------------
pub fn sec_to_ms(seconds: i64) -> i64 {
    seconds * 1000
}

pub fn ms_to_sec(millis: i64) -> i64 {
    millis / 1000
}

//==================================================================================================
/// Wall clock backed by the system time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

//==================================================================================================
/// Manually driven clock for deterministic tests
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now_ms: AtomicI64,
}

impl SimulatedClock {
    pub fn new(start_ms: i64) -> Self {
        SimulatedClock {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::Acquire)
    }
}
