//! HTTP client utilities.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response};

/// Shared HTTP client with sensible defaults and optional request-rate
/// limiting.
///
/// The NCBI E-utilities usage policy caps anonymous clients at 3 requests
/// per second; the limiter lets callers stay under whatever bound applies.
pub struct HttpClient {
    client: Client,
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpClient {
    /// Create a new client with the crate user agent and the given request
    /// timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Self::builder(timeout).build()?,
            limiter: None,
        })
    }

    /// Create a client that waits between requests to stay at or under
    /// `requests_per_second`.
    pub fn with_rate_limit(
        timeout: Duration,
        requests_per_second: NonZeroU32,
    ) -> Result<Self, reqwest::Error> {
        let limiter = RateLimiter::direct(Quota::per_second(requests_per_second));
        Ok(Self {
            client: Self::builder(timeout).build()?,
            limiter: Some(limiter),
        })
    }

    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
    }

    /// Issue a GET request, waiting for rate-limit clearance first.
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.client.get(url).send().await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}
