//! Reference implementations: a simulator platform adapter and canned trade
//! requests used by the manual test binary and the unit tests.
pub mod sample_requests;
pub mod simulator;
