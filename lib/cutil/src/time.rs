//! Time utilities for log formatting and cache busting.

use chrono::{Local, Utc};

/// Formats the current local time according to the specified format string.
///
/// The format string follows the same syntax as `chrono::format::strftime`.
///
/// # Examples
///
/// ```
/// use cutil::time::local_now;
///
/// let formatted = local_now("%H:%M:%S");
/// assert_eq!(formatted.len(), 8);
/// ```
pub fn local_now(format: &str) -> String {
    Local::now().format(format).to_string()
}

/// Gets the current Unix timestamp in milliseconds.
///
/// # Examples
///
/// ```
/// use cutil::time::timestamp_millis;
///
/// assert!(timestamp_millis() > 0);
/// ```
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Gets the current Unix timestamp in seconds.
pub fn timestamp() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_agree() {
        let secs = timestamp();
        let millis = timestamp_millis();
        assert!((millis / 1000 - secs).abs() <= 1);
    }

    #[test]
    fn test_local_now_format() {
        let date = local_now("%Y-%m-%d");
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('-').count(), 2);
    }
}
