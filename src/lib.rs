//! Benchmark harness for the SDR/SR/EC UDP transfer endpoints.
//!
//! Drives an external receiver/sender pair through a parameter sweep
//! over protocol mode, payload size, and packet-loss rate, applying
//! `tc netem` impairment scoped to the data port around each
//! measurement window, and emits one CSV row per trial.

pub mod endpoint;
pub mod impairment;
pub mod metrics;
pub mod mode;
pub mod report;
pub mod stream;
pub mod sweep;
pub mod trial;

pub mod test_util;

#[cfg(test)]
pub mod tests;

// Re-export commonly used items
pub use impairment::{ImpairmentSpec, NetemShaper, Shaper};
pub use mode::TransferMode;
pub use sweep::{SweepConfig, TrialResult, run_sweep};
pub use trial::{PairRunner, TrialRunner};
