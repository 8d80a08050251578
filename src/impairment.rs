//! `tc` based network impairment scoped to one UDP destination port.
//!
//! The data flow rides a netem qdisc on band 3 of a prio qdisc; a u32
//! filter routes only UDP packets for the measured port there, so the
//! TCP control channel and readiness signaling stay unshaped.

use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Delay/jitter/loss parameters for one measurement window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpairmentSpec {
    pub delay_ms: u32,
    pub jitter_ms: u32,
    pub loss_pct: f64,
}

impl ImpairmentSpec {
    /// True when nothing would be shaped (the interface stays untouched).
    pub fn is_noop(&self) -> bool {
        self.delay_ms == 0 && self.loss_pct <= 0.0
    }

    /// Parameter list for the band-3 netem qdisc.
    ///
    /// Jitter is meaningless without delay, so it is only appended when
    /// delay is present.
    fn netem_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.delay_ms > 0 {
            args.push("delay".into());
            args.push(format!("{}ms", self.delay_ms));
            if self.jitter_ms > 0 {
                args.push(format!("{}ms", self.jitter_ms));
            }
        }
        if self.loss_pct > 0.0 {
            args.push("loss".into());
            args.push(format!("{}%", self.loss_pct));
        }
        args
    }
}

/// Seam over kernel shaping so the sweep is testable without root.
pub trait Shaper {
    /// Replace any shaping on `interface` with `spec`, scoped to UDP
    /// traffic destined for `port`. A no-op spec leaves the interface
    /// unshaped. Failure invalidates the whole run.
    fn apply(&self, interface: &str, port: u16, spec: ImpairmentSpec) -> Result<()>;

    /// Remove the root qdisc. Idempotent; never fails the caller.
    fn clear(&self, interface: &str);
}

/// Real shaping via `sudo tc`.
pub struct NetemShaper;

impl Shaper for NetemShaper {
    fn apply(&self, interface: &str, port: u16, spec: ImpairmentSpec) -> Result<()> {
        // Always start clean; absence of a prior rule is the normal case.
        let _ = sudo(&["tc", "qdisc", "del", "dev", interface, "root"]);

        if spec.is_noop() {
            debug!(interface, "no impairment requested, interface left unshaped");
            return Ok(());
        }

        sudo_checked(&[
            "tc", "qdisc", "add", "dev", interface, "root", "handle", "1:", "prio", "bands", "3",
        ])
        .context("add prio qdisc")?;

        let netem = spec.netem_args();
        let mut args = vec![
            "tc", "qdisc", "add", "dev", interface, "parent", "1:3", "handle", "30:", "netem",
        ];
        args.extend(netem.iter().map(|s| s.as_str()));
        sudo_checked(&args).context("add netem qdisc")?;

        let dport = port.to_string();
        sudo_checked(&[
            "tc", "filter", "add", "dev", interface, "protocol", "ip", "parent", "1:0", "prio",
            "3", "u32", "match", "ip", "protocol", "17", "0xff", "match", "ip", "dport", &dport,
            "0xffff", "flowid", "1:3",
        ])
        .context("add udp dport filter")?;

        debug!(interface, port, ?spec, "impairment applied");
        Ok(())
    }

    fn clear(&self, interface: &str) {
        // Deleting a root qdisc that does not exist is fine.
        let _ = sudo(&["tc", "qdisc", "del", "dev", interface, "root"]);
        debug!(interface, "impairment cleared");
    }
}

/// Clears the interface on drop, so no exit path out of a measurement
/// window can leave a rule installed.
pub struct ShaperGuard<'a, S: Shaper + ?Sized> {
    shaper: &'a S,
    interface: &'a str,
}

impl<'a, S: Shaper + ?Sized> ShaperGuard<'a, S> {
    pub fn new(shaper: &'a S, interface: &'a str) -> Self {
        Self { shaper, interface }
    }
}

impl<S: Shaper + ?Sized> Drop for ShaperGuard<'_, S> {
    fn drop(&mut self) {
        self.shaper.clear(self.interface);
    }
}

// -- helpers --

/// Run `sudo <args>`, returning raw output.
fn sudo(args: &[&str]) -> Result<Output> {
    Command::new("sudo")
        .args(args)
        .output()
        .with_context(|| format!("sudo {}", args.join(" ")))
}

/// Run `sudo <args>`, bailing with stderr on non-zero exit.
fn sudo_checked(args: &[&str]) -> Result<Output> {
    let output = sudo(args)?;
    if !output.status.success() {
        bail!(
            "command failed: sudo {}\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}
