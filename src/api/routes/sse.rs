//! SSE Routes
//!
//! - GET /sse/:id - Subscribe to a stream over Server-Sent Events
//!
//! The response stays open until the stream's broadcaster closes it or the
//! client goes away. Dropping the response body drops the subscription,
//! which detaches the client from its stream.

use axum::{
    extract::{Path, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /sse/:id
///
/// Opens a long-lived event stream. The first event is always `connected`.
pub async fn subscribe(
    Path(stream_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let subscription = state.hub.connect(&stream_id)?;

    tracing::info!(
        stream = %stream_id,
        client = %subscription.handle().client(),
        "SSE connection opened"
    );

    let events = subscription.map(|frame| Ok::<_, Infallible>(Event::default().data(frame.data())));

    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    ))
}

/// GET /sse
///
/// A subscribe request without a stream id.
pub async fn missing_stream_id() -> ApiError {
    ApiError::Validation("Invalid stream ID: stream ID is required".to_string())
}
