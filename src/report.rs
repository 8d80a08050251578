//! Flat-file result sink.
//!
//! Fixed-column CSV, one header row, rows in sweep execution order.
//! Raw logs stay in memory only; the file carries the analysis columns.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::sweep::TrialResult;

pub const CSV_HEADER: &str =
    "mode,bytes,loss_pct,delay_ms,jitter_ms,iter,sender_ms,receiver_ms,throughput_mbps,fallback";

/// Serialize all results in a single write pass.
///
/// Fails fast: an I/O error aborts the run, there is no partial-write
/// recovery.
pub fn write_csv(path: &Path, results: &[TrialResult]) -> Result<()> {
    let mut out = String::with_capacity(64 * (results.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for r in results {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            r.mode,
            r.bytes,
            r.loss_pct,
            r.delay_ms,
            r.jitter_ms,
            r.iter,
            opt_cell(r.sender_ms),
            opt_cell(r.receiver_ms),
            r.throughput_mbps
                .map(|t| format!("{t:.6}"))
                .unwrap_or_default(),
            r.fallback,
        );
    }

    fs::write(path, out).with_context(|| format!("write {}", path.display()))
}

/// Numeric cell, empty when the value was unrecoverable.
fn opt_cell(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}
