// src/fetch/retry.rs

use reqwest::{
    header::{HeaderMap, RETRY_AFTER},
    Method, StatusCode,
};
use serde::Deserialize;
use std::time::Duration;

/// When and how long to wait before re-issuing a request.
///
/// `total` counts every request, the first one included. The delay before
/// retry `n` (1-based) is `backoff_factor * 2^(n-1)` seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    pub total: u32,
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
    pub allowed_methods: Vec<String>,
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 2.0,
            status_forcelist: vec![429, 500, 502, 503, 504],
            allowed_methods: vec!["GET".into(), "HEAD".into(), "OPTIONS".into()],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, method: &Method, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
            && self
                .allowed_methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    /// Exponential backoff before retry number `retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry as i32 - 1);
        Duration::try_from_secs_f64(secs).unwrap_or_default()
    }

    /// Backoff, raised to the server's `Retry-After` when that is longer.
    pub fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff(retry);
        match retry_after {
            Some(wait) if self.respect_retry_after => backoff.max(wait),
            _ => backoff,
        }
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
