//! HTTP conditional request module
//!
//! Provides `Last-Modified` formatting and `If-Modified-Since` handling.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate layout used by HTTP date headers
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a modification time as an HTTP date
///
/// # Returns
/// e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date header value, `None` when malformed
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check whether the client's copy is still current
///
/// `If-None-Match` takes precedence over `If-Modified-Since`; since no
/// `ETag` is ever sent, its presence disables the date check entirely.
/// Comparison is at whole-second resolution, like the header itself.
///
/// # Returns
/// Returns true if the response should be 304 Not Modified
pub fn is_not_modified(
    if_modified_since: Option<&str>,
    if_none_match: Option<&str>,
    modified: SystemTime,
) -> bool {
    if if_none_match.is_some() {
        return false;
    }
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn epoch_plus(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(epoch_plus(784_111_777)), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 784_111_777);
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn test_not_modified() {
        let modified = epoch_plus(784_111_777);
        let header = format_http_date(modified);
        assert!(is_not_modified(Some(&header), None, modified));
        // sub-second precision on the file is ignored
        assert!(is_not_modified(Some(&header), None, modified + Duration::from_millis(500)));
        assert!(is_not_modified(Some("Mon, 07 Nov 1994 00:00:00 GMT"), None, modified));
    }

    #[test]
    fn test_modified() {
        let modified = epoch_plus(784_111_777);
        assert!(!is_not_modified(Some("Sat, 05 Nov 1994 00:00:00 GMT"), None, modified));
        assert!(!is_not_modified(None, None, modified));
        assert!(!is_not_modified(Some("garbage"), None, modified));
    }

    #[test]
    fn test_if_none_match_disables_date_check() {
        let modified = epoch_plus(784_111_777);
        let header = format_http_date(modified);
        assert!(!is_not_modified(Some(&header), Some("\"abc\""), modified));
    }
}
