//! Paper fetching against the upstream literature database.
//!
//! [`PaperFetcher`] is the seam between the HTTP layer and the upstream
//! service: implementations resolve a query to an ordered sequence of
//! records. The trait is deliberately infallible — any upstream failure
//! degrades to an empty result, with the reason reported through `tracing`
//! rather than the caller.

mod entrez;
pub mod mock;

pub use entrez::EntrezFetcher;
pub use mock::MockFetcher;

use async_trait::async_trait;

use crate::models::PaperRecord;

/// A source of paper records for a search query.
#[async_trait]
pub trait PaperFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch up to `max_results` records matching `query`.
    ///
    /// Never fails: network errors, parse errors, timeouts, and empty
    /// search results all collapse into an empty vec. Callers that need the
    /// failure reason find it in the logs.
    async fn fetch(&self, query: &str, max_results: usize) -> Vec<PaperRecord>;
}

/// Errors that can occur while talking to the upstream service.
///
/// These never cross the [`PaperFetcher`] boundary; they exist so the
/// internal pipeline can classify failures for retry and logging.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// API error from the upstream service
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for FetchError {
    fn from(err: quick_xml::DeError) -> Self {
        FetchError::Parse(format!("XML: {}", err))
    }
}
