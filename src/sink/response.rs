//! Outcome of a single append call

use crate::types::StringMap;

/// Header carrying the number of seconds to wait after a 429
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Header carrying the seconds until the rate-limit window resets
pub const RATELIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Status, headers and body returned by a sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: StringMap,
    /// Response body, used for diagnostics
    pub text: String,
}

impl AppendResponse {
    /// Create a response with the given status
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A plain `200 OK`
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// A `429 Too Many Requests`, optionally with a `Retry-After` hint
    pub fn rate_limited(retry_after: Option<&str>) -> Self {
        let response = Self::new(429);
        match retry_after {
            Some(value) => response.with_header(RETRY_AFTER_HEADER, value),
            None => response,
        }
    }

    /// Add a header (name is lower-cased)
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the sink asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw `Retry-After` value
    pub fn retry_after(&self) -> Option<&str> {
        self.header(RETRY_AFTER_HEADER)
    }

    /// Raw `X-Ratelimit-Reset` value
    pub fn ratelimit_reset(&self) -> Option<&str> {
        self.header(RATELIMIT_RESET_HEADER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(200, true, false ; "ok")]
    #[test_case(202, true, false ; "accepted")]
    #[test_case(429, false, true ; "too many requests")]
    #[test_case(400, false, false ; "bad request")]
    #[test_case(503, false, false ; "unavailable")]
    fn test_status_classification(status: u16, success: bool, limited: bool) {
        let response = AppendResponse::new(status);
        assert_eq!(response.is_success(), success);
        assert_eq!(response.is_rate_limited(), limited);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = AppendResponse::rate_limited(Some("3"))
            .with_header("X-Ratelimit-Reset", "10")
            .with_text("slow down");

        assert_eq!(response.retry_after(), Some("3"));
        assert_eq!(response.header("Retry-After"), Some("3"));
        assert_eq!(response.ratelimit_reset(), Some("10"));
        assert_eq!(response.text, "slow down");
    }

    #[test]
    fn test_rate_limited_without_hint() {
        let response = AppendResponse::rate_limited(None);
        assert!(response.is_rate_limited());
        assert_eq!(response.retry_after(), None);
    }
}
