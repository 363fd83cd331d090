//! Broadcast Hub
//!
//! Server-push fan-out of generated events to named streams.
//!
//! ## Architecture
//!
//! - **StreamRegistry**: maps stream ids to live stream instances
//! - **SubscriptionManager**: attaches and detaches clients, starts a
//!   stream's broadcaster on its first client and retires the stream when
//!   the last one leaves
//! - **Broadcaster**: per-stream ticker that pulls payloads from an
//!   [`EventGenerator`] and writes them to every client sink
//! - **Messages**: event envelope and SSE frame encoding
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamcast::generators::RandomGenerator;
//! use streamcast::hub::{HubConfig, SubscriptionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = SubscriptionManager::new(Arc::new(RandomGenerator::new()), HubConfig::default());
//!
//!     let mut subscription = hub.connect("r1")?;
//!     while let Some(frame) = subscription.recv().await {
//!         print!("{}", frame.to_wire());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod broadcaster;
mod error;
mod generator;
mod manager;
mod messages;
mod registry;
mod sink;

pub use broadcaster::deliver;
pub use error::{HubError, HubResult, SinkError};
pub use generator::{Cursor, EventGenerator, Generated, Payload};
pub use manager::{HubConfig, Subscription, SubscriptionHandle, SubscriptionManager};
pub use messages::{Frame, StreamEvent, CONNECTED};
pub use registry::{StreamEntry, StreamId, StreamRegistry, StreamSnapshot, StreamState};
pub use sink::{channel, ClientId, ClientSink, ClientStream};
