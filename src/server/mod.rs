//! HTTP surface: router construction and shared state.

mod error;
mod handlers;

pub use error::ApiError;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::fetch::PaperFetcher;
use crate::store::PaperStore;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Upstream fetcher
    pub fetcher: Arc<dyn PaperFetcher>,
    /// Snapshot store
    pub store: Arc<dyn PaperStore>,
    /// Bound on identifiers requested per search
    pub max_results: usize,
}

impl AppState {
    /// Create the shared state.
    pub fn new(
        fetcher: Arc<dyn PaperFetcher>,
        store: Arc<dyn PaperStore>,
        max_results: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            max_results,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/papers", get(handlers::get_papers))
        .route("/search", get(handlers::search_papers))
        .route("/export/{format}", get(handlers::export_papers))
        .route("/paper/{id}", get(handlers::get_paper))
        .route("/test_fetch", get(handlers::test_fetch))
        .fallback(handlers::route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
