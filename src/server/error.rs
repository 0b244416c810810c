//! Translation of service errors to HTTP responses.
//!
//! Every error response is a JSON object with an `error` or `message` key;
//! the shape is part of the API contract.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

/// Handler-level errors, each mapping to one documented response.
#[derive(Debug)]
pub enum ApiError {
    /// 400 — `query` parameter absent or empty
    MissingQuery,
    /// 400 — export format other than json/csv
    InvalidFormat,
    /// 404 — fetch or snapshot produced zero records
    NoPapers,
    /// 404 — snapshot file does not exist yet
    SnapshotMissing,
    /// 404 — requested export artifact does not exist yet
    ExportFileMissing(String),
    /// 404 — id not present in the snapshot
    PaperNotFound,
    /// 404 — unknown route
    RouteNotFound,
    /// 500 — snapshot exists but is not valid JSON
    MalformedSnapshot,
    /// 500 — anything else
    Internal(String),
}

impl ApiError {
    /// Map a snapshot access failure onto the documented responses.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::SnapshotMissing,
            StoreError::Format(_) => ApiError::MalformedSnapshot,
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingQuery => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Missing query parameter"}),
            ),
            ApiError::InvalidFormat => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid format. Use 'json' or 'csv'."}),
            ),
            ApiError::NoPapers => (StatusCode::NOT_FOUND, json!({"message": "No papers found"})),
            ApiError::SnapshotMissing => (
                StatusCode::NOT_FOUND,
                json!({"error": "Papers file not found"}),
            ),
            ApiError::ExportFileMissing(format) => (
                StatusCode::NOT_FOUND,
                json!({"error": format!("{} file not found", format)}),
            ),
            ApiError::PaperNotFound => {
                (StatusCode::NOT_FOUND, json!({"error": "Paper not found"}))
            }
            ApiError::RouteNotFound => (
                StatusCode::NOT_FOUND,
                json!({"error": "Resource not found"}),
            ),
            ApiError::MalformedSnapshot => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Invalid JSON format"}),
            ),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": message}))
            }
        };

        (status, Json(body)).into_response()
    }
}
