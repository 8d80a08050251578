//! Process-pair coordination for a single trial.
//!
//! One receiver and one sender per trial, synchronized only through the
//! receiver's readiness marker. The sender is never launched before
//! readiness; the receiver is never left running past the completion
//! deadline. All timings come out of the captured logs, with a
//! wall-clock fallback for the sender only.

use std::fmt;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::endpoint::{
    self, FALLBACK_MARKER, READY_MARKER, RECEIVER_DONE_MARKER, SENDER_DONE_MARKER,
};
use crate::metrics;
use crate::mode::TransferMode;
use crate::stream::{LineStream, WaitOutcome};

/// How long the receiver gets to print its readiness marker.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the receiver gets to exit after the sender finished.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// Measurements and raw logs from one sender/receiver execution.
#[derive(Debug, Clone, Default)]
pub struct PairOutput {
    pub sender_ms: Option<u64>,
    pub receiver_ms: Option<u64>,
    pub fallback: bool,
    pub sender_log: String,
    pub receiver_log: String,
}

/// Failure that ends a trial before both endpoints produced output.
///
/// Recoverable at trial granularity: the sweep records a degraded row
/// and moves on.
#[derive(Debug)]
pub enum TrialError {
    /// The receiver never printed the readiness marker within the deadline.
    ReadinessTimeout { receiver_log: String },
    /// An endpoint process could not be started or its output pipe broke.
    Spawn(anyhow::Error),
}

impl TrialError {
    /// Degrade into a result with null timings, keeping whatever output
    /// was captured. Partial output is authoritative for the fallback
    /// flag.
    pub fn into_partial_output(self) -> PairOutput {
        match self {
            TrialError::ReadinessTimeout { receiver_log } => PairOutput {
                fallback: metrics::fallback_flagged(FALLBACK_MARKER, "", &receiver_log),
                receiver_log,
                ..Default::default()
            },
            TrialError::Spawn(_) => PairOutput::default(),
        }
    }
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialError::ReadinessTimeout { .. } => {
                write!(f, "receiver did not become ready in time")
            }
            TrialError::Spawn(err) => write!(f, "endpoint failed to start: {err:#}"),
        }
    }
}

/// Seam over trial execution so the sweep is testable without spawning
/// real processes.
pub trait TrialRunner {
    fn run(&self, mode: TransferMode, size: u64) -> Result<PairOutput, TrialError>;
}

/// Runs real endpoint binaries over loopback.
#[derive(Debug, Clone)]
pub struct PairRunner {
    pub receiver_bin: PathBuf,
    pub sender_bin: PathBuf,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub config_path: PathBuf,
    pub readiness_timeout: Duration,
    pub completion_timeout: Duration,
}

impl PairRunner {
    pub fn new(
        receiver_bin: PathBuf,
        sender_bin: PathBuf,
        tcp_port: u16,
        udp_port: u16,
        config_path: PathBuf,
    ) -> Self {
        Self {
            receiver_bin,
            sender_bin,
            tcp_port,
            udp_port,
            config_path,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }
}

impl TrialRunner for PairRunner {
    fn run(&self, mode: TransferMode, size: u64) -> Result<PairOutput, TrialError> {
        let recv_args =
            endpoint::receiver_args(mode, self.tcp_port, self.udp_port, size, &self.config_path);
        let (receiver, recv_pipe) =
            spawn_merged(&self.receiver_bin, &recv_args).map_err(TrialError::Spawn)?;
        let mut receiver = OwnedChild(receiver);
        debug!(pid = receiver.0.id(), %mode, size, "receiver spawned");

        let mut recv_stream = LineStream::spawn(BufReader::new(recv_pipe));
        match recv_stream.wait_for(|line| line.contains(READY_MARKER), self.readiness_timeout) {
            WaitOutcome::Ready => debug!("receiver ready"),
            WaitOutcome::Closed => {
                // Receiver exited without signaling readiness. Launch the
                // sender anyway; its connection failure is recorded as a
                // degraded trial, same as the original harness flow.
                warn!("receiver output closed before readiness marker");
            }
            WaitOutcome::TimedOut => {
                receiver.kill();
                recv_stream.drain(Duration::from_secs(2));
                return Err(TrialError::ReadinessTimeout {
                    receiver_log: recv_stream.into_captured(),
                });
            }
        }

        let send_args = endpoint::sender_args(mode, self.tcp_port, self.udp_port, size);
        let sender_start = Instant::now();
        let (sender_status, sender_log) =
            match run_to_completion(&self.sender_bin, &send_args) {
                Ok(v) => v,
                Err(err) => {
                    receiver.kill();
                    recv_stream.drain(Duration::from_secs(2));
                    return Err(TrialError::Spawn(err));
                }
            };
        let sender_wall_ms = sender_start.elapsed().as_millis() as u64;

        let sender_ms = if sender_status.success() {
            // Parsed duration preferred; wall clock around the whole
            // invocation otherwise.
            metrics::extract_duration_ms(&sender_log, SENDER_DONE_MARKER).or(Some(sender_wall_ms))
        } else {
            warn!(code = ?sender_status.code(), "sender exited non-zero");
            None
        };

        if !wait_with_timeout(&mut receiver.0, self.completion_timeout) {
            warn!(timeout = ?self.completion_timeout, "receiver did not exit, killing");
            receiver.kill();
        }
        // The pipe closes with the process, so this returns promptly.
        recv_stream.drain(Duration::from_secs(5));
        let receiver_log = recv_stream.into_captured();

        // No wall-clock fallback here: the receiver's lifetime includes
        // idle waiting before the sender connected.
        let receiver_ms = metrics::extract_duration_ms(&receiver_log, RECEIVER_DONE_MARKER);
        let fallback = metrics::fallback_flagged(FALLBACK_MARKER, &sender_log, &receiver_log);

        Ok(PairOutput {
            sender_ms,
            receiver_ms,
            fallback,
            sender_log,
            receiver_log,
        })
    }
}

/// Child process with kill-on-drop, so no exit path leaks a receiver.
struct OwnedChild(Child);

impl OwnedChild {
    fn kill(&mut self) {
        if self.0.try_wait().ok().flatten().is_none() {
            let _ = self.0.kill();
        }
        let _ = self.0.wait();
    }
}

impl Drop for OwnedChild {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Spawn with stdout and stderr merged into a single pipe, so the
/// marker contract sees the combined output stream.
fn spawn_merged(bin: &Path, args: &[String]) -> Result<(Child, std::io::PipeReader)> {
    let (reader, writer) = std::io::pipe().context("create output pipe")?;
    let writer2 = writer.try_clone().context("clone output pipe")?;
    let child = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer2)
        .spawn()
        .with_context(|| format!("spawn {}", bin.display()))?;
    Ok((child, reader))
}

/// Run `bin args...` to completion, capturing combined output.
fn run_to_completion(bin: &Path, args: &[String]) -> Result<(ExitStatus, String)> {
    let (mut child, pipe) = spawn_merged(bin, args)?;
    debug!(pid = child.id(), bin = %bin.display(), "sender spawned");
    let mut raw = Vec::new();
    BufReader::new(pipe)
        .read_to_end(&mut raw)
        .context("read sender output")?;
    let status = child.wait().context("wait for sender")?;
    Ok((status, String::from_utf8_lossy(&raw).into_owned()))
}

/// Poll for natural exit until `timeout` elapses.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            // try_wait errors are unrecoverable here; let the kill path
            // sort the process out.
            Err(_) => return false,
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(100));
    }
}
