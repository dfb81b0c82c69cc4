//! HTTP plumbing shared by the adapters

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

use super::ProviderError;

pub(crate) type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const USER_AGENT: &str = concat!("romvault/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// Direct rate limiter allowing `per_second` requests (at least one)
pub(crate) fn rate_limiter(per_second: u32) -> DirectRateLimiter {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    RateLimiter::direct(quota)
}

/// Turn a non-success response into `ProviderError::Status`
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Strip a trailing slash from a configured base URL
pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
