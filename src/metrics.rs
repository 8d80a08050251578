//! Duration and fallback extraction from endpoint log text.
//!
//! The endpoints report timing only in free-form log lines, so the
//! harness scrapes them. Extraction never fails a trial: anything that
//! does not parse is simply absent.

/// First integer following `marker` in `text`, scanning line by line.
///
/// A line that contains the marker but no parseable integer after it is
/// skipped, same as a line without the marker.
pub fn extract_duration_ms(text: &str, marker: &str) -> Option<u64> {
    text.lines().find_map(|line| {
        let rest = line.split(marker).nth(1)?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// True if either log contains `marker`.
pub fn fallback_flagged(marker: &str, sender_log: &str, receiver_log: &str) -> bool {
    sender_log.contains(marker) || receiver_log.contains(marker)
}
