//! Stream Routes
//!
//! Read-only introspection of the hub.
//!
//! - GET /api/v1/streams - List active streams
//! - GET /api/v1/streams/:id - Get one stream

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::StreamListResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::hub::StreamSnapshot;

/// GET /api/v1/streams
pub async fn list_streams(State(state): State<Arc<AppState>>) -> Json<StreamListResponse> {
    Json(StreamListResponse {
        streams: state.hub.snapshot(),
        total_clients: state.hub.client_count(),
    })
}

/// GET /api/v1/streams/:id
pub async fn get_stream(
    Path(stream_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StreamSnapshot>> {
    state
        .hub
        .stream(&stream_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("stream {}", stream_id)))
}
