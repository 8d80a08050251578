//! Shared utilities for integration tests.
//!
//! Real `PairRunner` trials against fake shell-script endpoints written
//! to a tempdir, so the coordinator's process handling is exercised
//! without the C++ binaries or root privileges.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sdr_bench::trial::PairRunner;

/// Write an executable shell script and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Well-behaved receiver: readiness marker, short transfer, completion line.
pub fn good_receiver(dir: &Path, transfer_ms: u64) -> PathBuf {
    write_script(
        dir,
        "sdr_test_receiver",
        &format!(
            "echo \"[Receiver] Waiting for sender connection...\"\n\
             sleep 0.2\n\
             echo \"[Receiver] Transfer completed in {transfer_ms} ms\""
        ),
    )
}

/// Well-behaved sender printing a parseable duration.
pub fn good_sender(dir: &Path, done_ms: u64) -> PathBuf {
    write_script(
        dir,
        "sdr_test_sender",
        &format!("echo \"[Sender][SR] Done in {done_ms} ms (1048576 bytes)\""),
    )
}

/// Receiver that never prints the readiness marker.
pub fn silent_receiver(dir: &Path) -> PathBuf {
    write_script(dir, "sdr_test_receiver", "sleep 60")
}

/// Receiver that becomes ready, reports a fallback, then hangs.
pub fn hanging_receiver(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "sdr_test_receiver",
        "echo \"[Receiver] Waiting for sender connection...\"\n\
         echo \"[Receiver] EC_FALLBACK_SR: decoder gave up\"\n\
         sleep 60",
    )
}

/// Sender that fails with a non-zero exit after some output.
pub fn failing_sender(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "sdr_test_sender",
        "echo \"[Sender][SR] connect refused\" >&2\nexit 3",
    )
}

/// Sender that prints no timing and takes ~`sleep_ms` to finish.
pub fn untimed_sender(dir: &Path, sleep_s: &str) -> PathBuf {
    write_script(
        dir,
        "sdr_test_sender",
        &format!("echo \"[Sender][SR] transfer finished\"\nsleep {sleep_s}"),
    )
}

/// PairRunner over the given scripts with test-sized timeouts.
pub fn runner(receiver: PathBuf, sender: PathBuf) -> PairRunner {
    let mut runner = PairRunner::new(
        receiver,
        sender,
        8888,
        9999,
        PathBuf::from("receiver.config"),
    );
    runner.readiness_timeout = Duration::from_millis(500);
    runner.completion_timeout = Duration::from_secs(2);
    runner
}
