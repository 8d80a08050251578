use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

static IFACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns `true` if the environment supports privileged `tc` tests
/// (requires the `tc`/`ip` tools and passwordless `sudo`).
pub fn check_privileges() -> bool {
    let has_tc = Command::new("tc")
        .arg("-Version")
        .output()
        .is_ok_and(|o| o.status.success());

    has_tc
        && Command::new("sudo")
            .args(["-n", "tc", "qdisc", "show"])
            .output()
            .is_ok_and(|o| o.status.success())
}

/// Generate a unique interface name safe for parallel tests.
///
/// Combines prefix + PID + atomic counter, truncated to 15 chars
/// (Linux netdev name limit).
pub fn unique_iface_name(prefix: &str) -> String {
    let seq = IFACE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id() % 0xffff;
    let name = format!("{prefix}_{pid:x}_{seq}");
    if name.len() > 15 {
        name[..15].to_string()
    } else {
        name
    }
}
