//! Human-facing sequential identifiers.
//!
//! Both allocators read the current maximum and add one. Nothing reserves the
//! value between the read and the insert, so two concurrent writers can be
//! handed the same number.

/// First incident number handed out.
pub const INCIDENT_ID_SEED: &str = "10001";

/// Base used when the latest incident number cannot be parsed.
const INCIDENT_ID_FALLBACK: u64 = 10000;

/// First SOS request id handed out.
pub const SOS_REQUEST_ID_SEED: i64 = 1001;

/// Next incident number after `latest`, zero-padded to five digits.
///
/// A latest value that is missing a number (or is zero) restarts from the
/// fallback base.
pub fn next_incident_id(latest: Option<&str>) -> String {
    let Some(latest) = latest else {
        return INCIDENT_ID_SEED.to_string();
    };
    let base = latest
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n != 0)
        .unwrap_or(INCIDENT_ID_FALLBACK);
    format!("{:05}", base + 1)
}

/// Next SOS request id after `latest`.
pub fn next_sos_request_id(latest: Option<i64>) -> i64 {
    match latest {
        Some(id) => id + 1,
        None => SOS_REQUEST_ID_SEED,
    }
}
