//! Trace identifiers for log correlation.

use chrono::Utc;
use rand::Rng;

/// Generate `{prefix}-{unix_millis_hex}-{random_hex}`.
///
/// Only used to correlate log lines of one run; not a security token.
pub fn new_trace_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0);
    let suffix: u32 = rand::thread_rng().gen();
    format!("{prefix}-{millis:x}-{suffix:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_three_parts() {
        let id = new_trace_id("extract");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "extract");
        assert!(u64::from_str_radix(parts[1], 16).is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(u32::from_str_radix(parts[2], 16).is_ok());
    }

    #[test]
    fn timestamp_is_recent() {
        let before = Utc::now().timestamp_millis() as u64;
        let id = new_trace_id("t");
        let millis = u64::from_str_radix(id.split('-').nth(1).unwrap(), 16).unwrap();
        assert!(millis >= before);
    }

    #[test]
    fn ids_differ() {
        let ids: std::collections::HashSet<String> = (0..50).map(|_| new_trace_id("x")).collect();
        assert!(ids.len() > 1);
    }
}
