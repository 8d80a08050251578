//! Parameter sweep over loss level, payload size, and transfer mode.
//!
//! The orchestrator owns the strict apply/clear pairing of impairment
//! rules and converts every trial-scoped failure into a degraded record
//! so a sweep always completes with a usable partial dataset.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::impairment::{ImpairmentSpec, Shaper, ShaperGuard};
use crate::mode::TransferMode;
use crate::trial::{PairOutput, TrialError, TrialRunner};

/// Full parameter space for one harness run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interface: String,
    pub udp_port: u16,
    /// Loss percentages, iterated in configured order.
    pub loss_levels: Vec<f64>,
    /// Base delay while loss is applied. Zero-loss combinations always
    /// run undelayed, whatever this is set to.
    pub delay_ms: u32,
    pub jitter_ms: u32,
    /// Payload sizes in bytes.
    pub sizes: Vec<u64>,
    pub modes: Vec<TransferMode>,
    pub iterations: u32,
    /// False when `tc` is managed externally (`--no-netem`).
    pub manage_impairment: bool,
}

/// One row of the result set.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub mode: TransferMode,
    pub bytes: u64,
    pub loss_pct: f64,
    pub delay_ms: u32,
    pub jitter_ms: u32,
    /// 1-based iteration index.
    pub iter: u32,
    pub sender_ms: Option<u64>,
    pub receiver_ms: Option<u64>,
    pub throughput_mbps: Option<f64>,
    pub fallback: bool,
    pub sender_log: String,
    pub receiver_log: String,
}

/// Throughput in Mbit/s from whichever duration is usable.
///
/// Receiver time is authoritative when present; a zero duration is
/// unusable and falls through like a missing one.
pub fn throughput_mbps(bytes: u64, receiver_ms: Option<u64>, sender_ms: Option<u64>) -> Option<f64> {
    let ms = receiver_ms
        .filter(|&m| m > 0)
        .or(sender_ms.filter(|&m| m > 0))?;
    Some(bytes as f64 * 8.0 / (ms as f64 / 1000.0) / 1e6)
}

/// Run the full sweep, one trial at a time.
///
/// Impairment is applied once per surviving (loss, size, mode)
/// combination and cleared after its iteration block; the guard also
/// clears on any propagating error. Only impairment installation
/// failures abort the run — per-trial failures become degraded rows.
pub fn run_sweep<S, R>(cfg: &SweepConfig, shaper: &S, runner: &R) -> Result<Vec<TrialResult>>
where
    S: Shaper,
    R: TrialRunner,
{
    let mut results = Vec::new();

    for &loss in &cfg.loss_levels {
        for &size in &cfg.sizes {
            for &mode in &cfg.modes {
                if mode.is_baseline() && loss != 0.0 {
                    // The baseline runs unimpaired by definition.
                    continue;
                }

                // Loss is the only axis swept independently: zero-loss
                // combinations run with delay and jitter zeroed too.
                let spec = ImpairmentSpec {
                    delay_ms: if loss > 0.0 { cfg.delay_ms } else { 0 },
                    jitter_ms: if loss > 0.0 { cfg.jitter_ms } else { 0 },
                    loss_pct: loss,
                };

                let guard = cfg
                    .manage_impairment
                    .then(|| ShaperGuard::new(shaper, &cfg.interface));
                if cfg.manage_impairment {
                    shaper
                        .apply(&cfg.interface, cfg.udp_port, spec)
                        .with_context(|| format!("apply impairment on {}", cfg.interface))?;
                }

                for iter in 1..=cfg.iterations {
                    info!(%mode, size, loss, iter, "running trial");
                    let outcome = runner.run(mode, size);
                    results.push(record(mode, size, loss, spec, iter, outcome));
                }

                drop(guard);
            }
        }
    }

    Ok(results)
}

/// Map a trial outcome to a row; failures become null-timing rows.
fn record(
    mode: TransferMode,
    size: u64,
    loss: f64,
    spec: ImpairmentSpec,
    iter: u32,
    outcome: Result<PairOutput, TrialError>,
) -> TrialResult {
    let out = match outcome {
        Ok(out) => out,
        Err(err) => {
            warn!(%mode, size, loss, iter, %err, "trial degraded");
            err.into_partial_output()
        }
    };

    TrialResult {
        mode,
        bytes: size,
        loss_pct: loss,
        delay_ms: spec.delay_ms,
        jitter_ms: spec.jitter_ms,
        iter,
        throughput_mbps: throughput_mbps(size, out.receiver_ms, out.sender_ms),
        sender_ms: out.sender_ms,
        receiver_ms: out.receiver_ms,
        fallback: out.fallback,
        sender_log: out.sender_log,
        receiver_log: out.receiver_log,
    }
}
