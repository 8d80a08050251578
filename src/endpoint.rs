//! Contract with the external transfer endpoints.
//!
//! The harness drives the `sdr_test_receiver` / `sdr_test_sender`
//! programs and synchronizes with them purely through their text
//! output, so the marker strings and argv shapes below are the whole
//! interface.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::mode::TransferMode;

/// Printed by the receiver once it is listening and the sender may start.
pub const READY_MARKER: &str = "Waiting for sender connection";

/// Sender completion line: `Done in <N> ms`.
pub const SENDER_DONE_MARKER: &str = "Done in ";

/// Receiver completion line: `Transfer completed in <N> ms`.
pub const RECEIVER_DONE_MARKER: &str = "Transfer completed in ";

/// Emitted by either side when the EC pipeline downgrades to selective repeat.
pub const FALLBACK_MARKER: &str = "EC_FALLBACK_SR";

/// Transfers always run over loopback; only the shaping rule makes it lossy.
pub const LOOPBACK_ADDR: &str = "127.0.0.1";

pub const RECEIVER_BIN: &str = "sdr_test_receiver";
pub const SENDER_BIN: &str = "sdr_test_sender";

/// Resolved locations of the two endpoint binaries.
#[derive(Debug, Clone)]
pub struct EndpointPaths {
    pub receiver: PathBuf,
    pub sender: PathBuf,
}

impl EndpointPaths {
    /// Locate both binaries under `bin_dir`, failing up front so a
    /// missing build surfaces before any impairment is installed.
    pub fn locate(bin_dir: &Path) -> Result<Self> {
        let receiver = bin_dir.join(RECEIVER_BIN);
        let sender = bin_dir.join(SENDER_BIN);
        for bin in [&receiver, &sender] {
            if !bin.exists() {
                bail!(
                    "endpoint binary {} not found (build the endpoints first)",
                    bin.display()
                );
            }
        }
        Ok(Self { receiver, sender })
    }
}

/// Receiver argv: `--mode <m> <tcp_port> <udp_port> <size> <config>`.
pub fn receiver_args(
    mode: TransferMode,
    tcp_port: u16,
    udp_port: u16,
    size: u64,
    config: &Path,
) -> Vec<String> {
    vec![
        "--mode".into(),
        mode.to_string(),
        tcp_port.to_string(),
        udp_port.to_string(),
        size.to_string(),
        config.display().to_string(),
    ]
}

/// Sender argv: `--mode <m> <server_ip> <tcp_port> <udp_port> <size>`.
pub fn sender_args(mode: TransferMode, tcp_port: u16, udp_port: u16, size: u64) -> Vec<String> {
    vec![
        "--mode".into(),
        mode.to_string(),
        LOOPBACK_ADDR.into(),
        tcp_port.to_string(),
        udp_port.to_string(),
        size.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_args_shape() {
        let args = receiver_args(
            TransferMode::Ec,
            8888,
            9999,
            1_048_576,
            Path::new("config/receiver.config"),
        );
        assert_eq!(
            args,
            [
                "--mode",
                "ec",
                "8888",
                "9999",
                "1048576",
                "config/receiver.config"
            ]
        );
    }

    #[test]
    fn test_sender_targets_loopback() {
        let args = sender_args(TransferMode::Sr, 8888, 9999, 4096);
        assert_eq!(args, ["--mode", "sr", "127.0.0.1", "8888", "9999", "4096"]);
    }

    #[test]
    fn test_locate_missing_binaries() {
        let err = EndpointPaths::locate(Path::new("/nonexistent/build")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
