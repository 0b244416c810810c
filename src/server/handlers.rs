//! Request handlers for the HTTP surface.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::export;
use crate::models::{find_by_id, PaperRecord};
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::store::StoreError;

/// Fixed query used by the fetch debug endpoint.
const TEST_FETCH_QUERY: &str = "cancer";

/// GET /
pub async fn home() -> &'static str {
    "Welcome to PubMed Fetcher API!"
}

/// GET /papers — regenerate the CSV export from the snapshot.
pub async fn get_papers(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let papers = state.store.load().map_err(ApiError::from_store)?;

    if papers.is_empty() {
        tracing::warn!("no papers in snapshot");
        return Err(ApiError::NoPapers);
    }

    let csv = export::to_csv(&papers).map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .store
        .save_csv(&csv)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(count = papers.len(), "papers exported to CSV");
    Ok(Json(json!({"message": "Papers exported to CSV successfully"})))
}

/// GET /search?query=...
pub async fn search_papers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    let query = params
        .get("query")
        .map(String::as_str)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let papers = state.fetcher.fetch(query, state.max_results).await;

    if papers.is_empty() {
        tracing::warn!(query, "no papers found");
        return Err(ApiError::NoPapers);
    }

    tracing::info!(count = papers.len(), query, "search succeeded");
    Ok(Json(papers))
}

/// GET /export/{format} — download the snapshot or its CSV rendition.
pub async fn export_papers(
    State(state): State<AppState>,
    Path(format): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type, filename) = match format.as_str() {
        "json" => (
            state.store.snapshot_bytes(),
            "application/json",
            "papers.json",
        ),
        "csv" => (
            state.store.csv_bytes(),
            "text/csv; charset=utf-8",
            "exported_papers.csv",
        ),
        _ => return Err(ApiError::InvalidFormat),
    };

    let bytes = bytes.map_err(|err| match err {
        StoreError::NotFound(_) => ApiError::ExportFileMissing(format.clone()),
        other => ApiError::Internal(other.to_string()),
    })?;

    let headers = [
        (CONTENT_TYPE, content_type.to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, bytes))
}

/// GET /paper/{id}
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<PaperRecord>, ApiError> {
    let papers = state.store.load().map_err(ApiError::from_store)?;

    match find_by_id(&papers, &paper_id) {
        Some(paper) => {
            tracing::info!(id = %paper_id, "paper found");
            Ok(Json(paper.clone()))
        }
        None => {
            tracing::warn!(id = %paper_id, "paper not found");
            Err(ApiError::PaperNotFound)
        }
    }
}

/// GET /test_fetch — exercise the fetcher with a fixed query.
pub async fn test_fetch(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    let papers = state.fetcher.fetch(TEST_FETCH_QUERY, state.max_results).await;

    if papers.is_empty() {
        return Err(ApiError::NoPapers);
    }

    Ok(Json(papers))
}

/// Fallback for unknown routes.
pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
