use reqwest::header::HeaderMap;

use crate::state::RateLimitInfo;

/// Wait time used when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Read quota headers. Only returns `Some` when limit, remaining and reset are
/// all present, so callers can watch quota drain on successful responses too.
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let limit = header_number(headers, LIMIT_HEADER)?;
    let remaining = header_number(headers, REMAINING_HEADER)?;
    let reset_time = header_number(headers, RESET_HEADER)?;

    Some(RateLimitInfo {
        limit,
        remaining,
        reset_time,
        retry_after: header_number(headers, RETRY_AFTER_HEADER),
    })
}

/// `Retry-After` in seconds, defaulting to [`DEFAULT_RETRY_AFTER_SECS`]
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    header_number(headers, RETRY_AFTER_HEADER).unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
