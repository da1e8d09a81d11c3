//! Read-only REST API over the indexed events.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::error;

use crate::db;
use crate::errors::IndexerError;
use crate::events::{EventRecord, ProfileSummary};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(get_all_events))
        .route("/profiles/:id/events", get(get_profile_events))
        .route("/profiles/:id/summary", get(get_profile_summary))
        .with_state(state)
}

#[derive(Serialize)]
pub struct EventsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    /// Stored event type, e.g. `vote_cast`.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// Handler-level failure mapped onto an HTTP status.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(IndexerError),
}

impl From<IndexerError> for ApiError {
    fn from(e: IndexerError) -> Self {
        match e {
            IndexerError::InvalidProfileId(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(e) => {
                error!("API request failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Profile IDs are 32 bytes, addressed as hex in URLs.
fn normalise_profile_id(raw: &str) -> Result<String, IndexerError> {
    let id = raw.trim().to_ascii_lowercase();
    match hex::decode(&id) {
        Ok(bytes) if bytes.len() == 32 => Ok(id),
        _ => Err(IndexerError::InvalidProfileId(raw.to_string())),
    }
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events[?type=…]`
pub async fn get_all_events(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = db::get_all_events(&state.pool, query.event_type.as_deref()).await?;
    Ok(Json(EventsResponse {
        profile_id: None,
        count: events.len(),
        events,
    }))
}

/// `GET /profiles/:id/events`
pub async fn get_profile_events(
    State(state): State<Arc<ApiState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let profile_id = normalise_profile_id(&raw_id)?;
    let events = db::get_events_for_profile(&state.pool, &profile_id).await?;
    Ok(Json(EventsResponse {
        profile_id: Some(profile_id),
        count: events.len(),
        events,
    }))
}

/// `GET /profiles/:id/summary`
///
/// Funding, vote and outcome totals folded from the profile's events.
pub async fn get_profile_summary(
    State(state): State<Arc<ApiState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ProfileSummary>, ApiError> {
    let profile_id = normalise_profile_id(&raw_id)?;
    db::profile_summary(&state.pool, &profile_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no events indexed for profile {profile_id}")))
}
