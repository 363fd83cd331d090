//! Streamcast HTTP API
//!
//! Thin transport over the broadcast hub, built with Axum.
//!
//! # Endpoints
//!
//! ## Streams
//! - `GET /sse/:id` - Subscribe to a stream (Server-Sent Events)
//! - `GET /api/v1/streams` - List active streams
//! - `GET /api/v1/streams/:id` - Get one stream
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use streamcast::api::{serve, ApiConfig, AppState};
//! use streamcast::generators::GeneratorKind;
//! use streamcast::hub::{HubConfig, SubscriptionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = SubscriptionManager::new(GeneratorKind::Transcript.build(), HubConfig::default());
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(hub, config.clone()), &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let sse_routes = Router::new()
        .route("/", get(routes::sse::missing_stream_id))
        .route("/:id", get(routes::sse::subscribe));

    let api_routes = Router::new()
        .route("/streams", get(routes::streams::list_streams))
        .route("/streams/:id", get(routes::streams::get_stream));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/sse", sse_routes)
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the server on the configured address
///
/// Runs until SIGINT/SIGTERM, then closes every stream before returning.
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Streamcast listening on {}", addr);
    tracing::info!("Subscribe with: http://{}/sse/{{id}}", addr);

    serve_on(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// The hub is shut down before the server waits for open connections, so
/// long-lived event streams end instead of holding the shutdown open.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = state.hub.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            hub.shutdown().await;
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Streamcast shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, closing streams");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{GeneratorKind, RandomGenerator};
    use crate::hub::{HubConfig, SubscriptionManager};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use futures_util::StreamExt;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, SubscriptionManager) {
        let config = HubConfig {
            tick_interval: Duration::from_millis(20),
            grace_period: Duration::from_millis(20),
            ..HubConfig::default()
        };
        let hub = SubscriptionManager::new(Arc::new(RandomGenerator::new()), config);
        let state = AppState::new(hub.clone(), ApiConfig::default());

        (build_router(state), hub)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _hub) = create_test_app();

        let response = app.oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _hub) = create_test_app();

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["activeStreams"], 0);
        assert_eq!(body["generator"], "random");
    }

    #[tokio::test]
    async fn test_ready_turns_unavailable_on_shutdown() {
        let (app, hub) = create_test_app();

        let response = app.clone().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        hub.shutdown().await;

        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_sse_subscribe_streams_events() {
        let (app, hub) = create_test_app();

        let response = app.oneshot(get("/sse/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(hub.stream("abc").unwrap().clients, 1);

        let mut body = response.into_body().into_data_stream();
        let mut text = String::new();
        while text.matches("\n\n").count() < 2 {
            let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            text.push_str(&String::from_utf8_lossy(&chunk));
        }

        let mut frames = text.split("\n\n");
        let connected = frames.next().unwrap();
        assert!(connected.starts_with("data: {\"type\":\"connected\",\"streamId\":\"abc\""));
        let tick = frames.next().unwrap();
        assert!(tick.starts_with("data: {\"type\":\"random\""));

        // Client goes away
        drop(body);
        assert!(hub.stream("abc").is_none());
    }

    #[tokio::test]
    async fn test_sse_allows_cross_origin() {
        let (app, hub) = create_test_app();

        let request = Request::builder()
            .uri("/sse/abc")
            .header(header::ORIGIN, "http://dashboard.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        drop(response);
        assert!(hub.stream("abc").is_none());

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/sse/abc")
            .header(header::ORIGIN, "http://dashboard.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(preflight).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(hub.stream_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_rejects_blank_id() {
        let (app, hub) = create_test_app();

        let response = app.oneshot(get("/sse/%20%20")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(hub.stream_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_requires_id() {
        let (app, _hub) = create_test_app();

        let response = app.oneshot(get("/sse")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sse_unavailable_after_shutdown() {
        let (app, hub) = create_test_app();
        hub.shutdown().await;

        let response = app.oneshot(get("/sse/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_list_streams() {
        let (app, hub) = create_test_app();
        let _one = hub.connect("one").unwrap();
        let _two = hub.connect("two").unwrap();

        let response = app.oneshot(get("/api/v1/streams")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["totalClients"], 2);
        assert_eq!(body["streams"][0]["streamId"], "one");
        assert_eq!(body["streams"][1]["streamId"], "two");
        assert_eq!(body["streams"][0]["running"], true);
    }

    #[tokio::test]
    async fn test_get_stream() {
        let (app, hub) = create_test_app();
        let _sub = hub.connect("abc").unwrap();

        let response = app.clone().oneshot(get("/api/v1/streams/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["clients"], 1);

        let response = app.oneshot(get("/api/v1/streams/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_on_shuts_down_hub() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let hub = SubscriptionManager::new(GeneratorKind::Random.build(), HubConfig::default());
        let state = AppState::new(hub.clone(), ApiConfig::default());
        let _sub = hub.connect("abc").unwrap();

        serve_on(listener, state, async {}).await.unwrap();

        assert!(hub.is_shutting_down());
        assert_eq!(hub.stream_count(), 0);
    }
}
