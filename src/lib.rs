//! # Streamcast
//!
//! Server-push broadcast hub: clients subscribe to named streams over a
//! long-lived Server-Sent Events response, and a per-stream generator
//! produces events that are fanned out to every current subscriber.
//!
//! ## Features
//!
//! - **Lazy streams**: a stream is created by its first subscriber
//! - **Self-reclaiming**: the last unsubscribe stops the ticker and frees the stream
//! - **Isolated clients**: a stalled or failed client is pruned without
//!   delaying anyone else
//! - **Pluggable content**: scripted or unbounded [`EventGenerator`]s
//!
//! ## Modules
//!
//! - [`hub`]: Registry, subscription manager and broadcaster
//! - [`generators`]: Built-in event generators
//! - [`api`]: HTTP transport with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamcast::generators::GeneratorKind;
//! use streamcast::hub::{HubConfig, SubscriptionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = SubscriptionManager::new(GeneratorKind::Transcript.build(), HubConfig::default());
//!
//!     // Subscribe to stream "abc": a `connected` event, then one line per tick,
//!     // then a summary, after which the stream closes.
//!     let mut subscription = hub.connect("abc")?;
//!     while let Some(frame) = subscription.recv().await {
//!         println!("{}", frame.data());
//!     }
//!
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod generators;
pub mod hub;

// Re-export top-level types for convenience
pub use hub::{
    ClientSink, Cursor, EventGenerator, Frame, Generated, HubConfig, HubError, Payload,
    StreamEvent, StreamId, Subscription, SubscriptionHandle, SubscriptionManager,
};

pub use generators::{GeneratorKind, RandomGenerator, TranscriptGenerator};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{BroadcastConfig, Config, ConfigError, LoggingConfig, ServerConfig};
