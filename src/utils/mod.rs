//! Utility modules supporting fetch operations.
//!
//! - [`HttpClient`]: HTTP client with timeouts and optional rate limiting
//! - [`RetryConfig`] / [`with_retry`]: automatic retry on transient upstream
//!   errors with exponential backoff

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};
