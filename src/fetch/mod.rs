// src/fetch/mod.rs

pub mod retry;

pub use retry::RetryPolicy;

use crate::error::FetchError;
use bytes::Bytes;
use reqwest::{Client, Method};
use tokio::time::sleep;
use tracing::{debug, error, info, warn, Span};
use url::Url;

/// HTTP client that re-issues requests on transient statuses per its [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    span: Span,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy, span: Span) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::with_client(client, policy, span))
    }

    pub fn with_client(client: Client, policy: RetryPolicy, span: Span) -> Self {
        Self {
            client,
            policy,
            span,
        }
    }

    /// GET `url` and return the whole body.
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        self.request(Method::GET, url).await
    }

    pub async fn request(&self, method: Method, url: &Url) -> Result<Bytes, FetchError> {
        let max_attempts = self.policy.total.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(parent: &self.span, %method, %url, attempt, "sending request");

            // connection failures are not retried
            let resp = self
                .client
                .request(method.clone(), url.clone())
                .send()
                .await
                .map_err(|source| {
                    error!(parent: &self.span, %url, attempt, error = %source, "request failed");
                    FetchError::Transport {
                        method: method.clone(),
                        url: url.to_string(),
                        attempt,
                        source,
                    }
                })?;

            let status = resp.status();
            if status.is_success() {
                let body = resp.bytes().await.map_err(|source| FetchError::Body {
                    url: url.to_string(),
                    source,
                })?;
                info!(parent: &self.span, %url, attempt, bytes = body.len(), "fetched");
                return Ok(body);
            }

            if attempt < max_attempts && self.policy.is_retryable(&method, status) {
                let delay = self
                    .policy
                    .delay(attempt, retry::retry_after(resp.headers()));
                drop(resp);
                warn!(
                    parent: &self.span,
                    %url,
                    %status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient status, retrying"
                );
                sleep(delay).await;
                continue;
            }

            error!(parent: &self.span, %url, %status, attempts = attempt, "giving up");
            return Err(FetchError::Status {
                method,
                url: url.to_string(),
                status,
                attempts: attempt,
            });
        }
    }
}
