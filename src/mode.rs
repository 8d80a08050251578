//! Transfer mode enum for endpoint selection.

use std::fmt;

/// Protocol mode the endpoint pair runs for a trial.
///
/// Passed through to both test binaries via their `--mode` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferMode {
    /// Plain datagram pipeline, no retransmission or coding.
    /// Baseline: only ever measured without impairment.
    Sdr,

    /// Selective-repeat retransmission.
    Sr,

    /// Erasure-coded transfer. May downgrade to selective repeat at
    /// runtime, signaled by the fallback marker in the logs.
    Ec,
}

impl TransferMode {
    /// All modes in sweep order.
    pub const ALL: [TransferMode; 3] = [TransferMode::Sdr, TransferMode::Sr, TransferMode::Ec];

    /// Check if this is the impairment-free baseline.
    pub const fn is_baseline(self) -> bool {
        matches!(self, TransferMode::Sdr)
    }

    /// The `--mode` argument value for the endpoint binaries.
    pub const fn as_str(self) -> &'static str {
        match self {
            TransferMode::Sdr => "sdr",
            TransferMode::Sr => "sr",
            TransferMode::Ec => "ec",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sdr" => Ok(TransferMode::Sdr),
            "sr" => Ok(TransferMode::Sr),
            "ec" => Ok(TransferMode::Ec),
            _ => Err(format!("invalid mode '{}': use sdr, sr, or ec", s)),
        }
    }
}

impl clap::ValueEnum for TransferMode {
    fn value_variants<'a>() -> &'a [Self] {
        &TransferMode::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}
