//! Quota status response headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::ratelimit::QuotaStatus;

/// Requests allowed per window.
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Requests left in the current window.
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// Reset value, in seconds.
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Write the quota status into `headers`, replacing any previous values.
///
/// Values are written raw; `remaining` can be negative.
pub fn apply_quota_headers(headers: &mut HeaderMap, status: &QuotaStatus) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(status.reset));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_written() {
        let mut headers = HeaderMap::new();
        apply_quota_headers(
            &mut headers,
            &QuotaStatus {
                limit: 100,
                remaining: 42,
                reset: 900,
            },
        );

        assert_eq!(headers["x-ratelimit-limit"], "100");
        assert_eq!(headers["x-ratelimit-remaining"], "42");
        assert_eq!(headers["x-ratelimit-reset"], "900");
    }

    #[test]
    fn test_negative_remaining_kept() {
        let mut headers = HeaderMap::new();
        apply_quota_headers(
            &mut headers,
            &QuotaStatus {
                limit: 1,
                remaining: -3,
                reset: 10,
            },
        );

        assert_eq!(headers[X_RATELIMIT_REMAINING], "-3");
    }

    #[test]
    fn test_existing_values_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from_static("stale"));

        apply_quota_headers(
            &mut headers,
            &QuotaStatus {
                limit: 5,
                remaining: 4,
                reset: 60,
            },
        );

        assert_eq!(headers.get_all(X_RATELIMIT_LIMIT).iter().count(), 1);
        assert_eq!(headers[X_RATELIMIT_LIMIT], "5");
    }
}
