//! Subscription Manager
//!
//! Owns the stream registry and drives every stream's lifecycle:
//!
//! - the first subscriber of an id creates the stream and starts its
//!   broadcaster
//! - unsubscribes and failed writes detach clients
//! - the client set becoming empty retires the instance: its ticker is
//!   cancelled, its sinks are closed and its registry slot is released
//!
//! Per-stream mutations happen under that stream's lock only, so unrelated
//! streams never contend. Everything here is synchronous apart from
//! [`SubscriptionManager::shutdown`], which lets a transport unsubscribe
//! from a `Drop` impl.

use futures_util::{future::join_all, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::broadcaster::Broadcaster;
use super::error::{HubError, HubResult};
use super::generator::EventGenerator;
use super::messages::{Frame, StreamEvent};
use super::registry::{StreamEntry, StreamId, StreamRegistry, StreamSnapshot, StreamState};
use super::sink::{self, ClientId, ClientSink, ClientStream};

/// Configuration for the subscription manager and its broadcasters
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Time between two ticks of a stream
    pub tick_interval: Duration,
    /// Delay between a terminal event and closing the stream's clients
    pub grace_period: Duration,
    /// Longest a single client write may wait for buffer space
    ///
    /// A tick waits for its slowest write, so keep this below
    /// `tick_interval` or one stalled client delays everyone's next tick.
    pub write_timeout: Duration,
    /// Frames buffered per client before writes start waiting
    pub client_buffer: usize,
    /// Maximum number of concurrent clients across all streams
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            grace_period: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            client_buffer: 16,
            max_connections: 1000,
        }
    }
}

/// Proof of one successful subscribe, consumed by [`SubscriptionManager::unsubscribe`]
#[derive(Debug)]
pub struct SubscriptionHandle {
    entry: Arc<StreamEntry>,
    client: ClientId,
    consumed: AtomicBool,
}

impl SubscriptionHandle {
    pub fn stream_id(&self) -> &StreamId {
        self.entry.id()
    }

    pub fn instance(&self) -> u64 {
        self.entry.instance()
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

/// Sinks and ticker taken out of a stream being retired
struct Retired {
    clients: Vec<ClientSink>,
    ticker: Option<super::registry::Ticker>,
}

struct Inner {
    registry: StreamRegistry,
    generator: Arc<dyn EventGenerator>,
    config: HubConfig,
    shutdown: CancellationToken,
    connections: AtomicUsize,
}

/// Entry point for attaching and detaching clients
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(generator: Arc<dyn EventGenerator>, config: HubConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: StreamRegistry::new(),
                generator,
                config,
                shutdown: CancellationToken::new(),
                connections: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn generator(&self) -> &dyn EventGenerator {
        self.inner.generator.as_ref()
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.inner.registry
    }

    pub(crate) fn child_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Attach `sink` to `stream_id`
    ///
    /// The sink receives a `connected` event before anything else. The first
    /// client of a stream creates it and starts its broadcaster.
    pub fn subscribe(&self, stream_id: &StreamId, sink: ClientSink) -> HubResult<SubscriptionHandle> {
        if self.is_shutting_down() {
            return Err(HubError::ShuttingDown);
        }

        self.reserve_connection()?;

        // The ack goes out before the sink is visible to the ticker, so it is
        // always the first frame the client sees.
        let acked = Frame::encode(&StreamEvent::connected(stream_id.as_str()))
            .map_err(HubError::from)
            .and_then(|ack| sink.try_send(ack).map_err(|_| HubError::ClientClosed));
        if let Err(e) = acked {
            self.release_connections(1);
            return Err(e);
        }

        loop {
            let entry = self.inner.registry.get_or_create(stream_id);
            let mut state = entry.lock();

            if entry.is_closed() {
                // Lost a race with retirement; the registry now hands out a fresh instance
                continue;
            }

            if self.is_shutting_down() {
                let abandoned = state.clients.is_empty();
                if abandoned {
                    entry.mark_closed();
                }
                drop(state);
                if abandoned {
                    self.inner.registry.remove_instance(&entry);
                }
                self.release_connections(1);
                return Err(HubError::ShuttingDown);
            }

            let client = sink.id();
            state.clients.push(sink);
            let clients = state.clients.len();

            if state.ticker.is_none() {
                state.ticker = Some(Broadcaster::start(self.clone(), Arc::clone(&entry)));
            }
            drop(state);

            tracing::info!(
                stream = %stream_id,
                instance = entry.instance(),
                client = %client,
                clients,
                "Client subscribed"
            );

            return Ok(SubscriptionHandle {
                entry,
                client,
                consumed: AtomicBool::new(false),
            });
        }
    }

    /// Parse `raw_id`, create a sink and subscribe it
    ///
    /// The returned [`Subscription`] unsubscribes itself when dropped.
    pub fn connect(&self, raw_id: &str) -> HubResult<Subscription> {
        let stream_id = StreamId::parse(raw_id)?;
        let (sink, events) = sink::channel(self.inner.config.client_buffer);
        let handle = self.subscribe(&stream_id, sink)?;

        Ok(Subscription {
            manager: self.clone(),
            handle,
            events,
        })
    }

    /// Detach the client behind `handle`
    ///
    /// Only the first call per handle has any effect.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if handle.consumed.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.detach(&handle.entry, &[handle.client]) > 0 {
            tracing::info!(
                stream = %handle.entry.id(),
                client = %handle.client,
                "Client unsubscribed"
            );
        }
    }

    /// Remove `clients` from `entry`, retiring the stream if none remain
    ///
    /// Returns how many were actually removed; unknown clients are ignored.
    pub(crate) fn detach(&self, entry: &Arc<StreamEntry>, clients: &[ClientId]) -> usize {
        let (removed, remaining, retired) = {
            let mut state = entry.lock();
            let before = state.clients.len();
            state.clients.retain(|sink| !clients.contains(&sink.id()));
            let removed = before - state.clients.len();

            let retired = (removed > 0 && state.clients.is_empty())
                .then(|| Self::retire_locked(entry, &mut state));
            (removed, state.clients.len(), retired)
        };

        self.release_connections(removed);

        tracing::debug!(
            stream = %entry.id(),
            instance = entry.instance(),
            removed,
            clients = remaining,
            "Clients detached"
        );

        if let Some(retired) = retired {
            self.finish_retire(entry, retired);
        }

        removed
    }

    /// Retire `entry`: close every sink, stop its ticker, release its slot
    ///
    /// Idempotent. Returns the ticker task if this call stopped it.
    pub(crate) fn retire(&self, entry: &Arc<StreamEntry>) -> Option<JoinHandle<()>> {
        let retired = {
            let mut state = entry.lock();
            Self::retire_locked(entry, &mut state)
        };
        self.finish_retire(entry, retired)
    }

    fn retire_locked(entry: &StreamEntry, state: &mut StreamState) -> Retired {
        entry.mark_closed();
        Retired {
            clients: std::mem::take(&mut state.clients),
            ticker: state.ticker.take(),
        }
    }

    fn finish_retire(&self, entry: &Arc<StreamEntry>, retired: Retired) -> Option<JoinHandle<()>> {
        let removed = self.inner.registry.remove_instance(entry);

        let task = retired.ticker.map(|ticker| {
            ticker.cancel.cancel();
            ticker.task
        });

        let closed = retired.clients.len();
        self.release_connections(closed);
        // Dropping the registry-owned sinks ends each client's stream
        drop(retired.clients);

        if removed || task.is_some() || closed > 0 {
            tracing::info!(
                stream = %entry.id(),
                instance = entry.instance(),
                closed_clients = closed,
                "Stream retired"
            );
        }

        task
    }

    /// Stop every broadcaster and close every client
    ///
    /// New subscribes fail with [`HubError::ShuttingDown`] from here on.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let entries = self.inner.registry.drain();
        let count = entries.len();
        let tasks: Vec<_> = entries
            .iter()
            .filter_map(|entry| self.retire(entry))
            .collect();

        for result in join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Broadcaster task ended abnormally");
            }
        }

        tracing::info!(streams = count, "Subscription manager shut down");
    }

    /// Snapshot of every registered stream, ordered by id
    pub fn snapshot(&self) -> Vec<StreamSnapshot> {
        let mut streams: Vec<_> = self
            .inner
            .registry
            .entries()
            .iter()
            .map(|entry| entry.snapshot())
            .collect();
        streams.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        streams
    }

    pub fn stream(&self, id: &str) -> Option<StreamSnapshot> {
        self.inner.registry.get(id).map(|entry| entry.snapshot())
    }

    pub fn stream_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Clients currently attached across all streams
    pub fn client_count(&self) -> usize {
        self.inner.connections.load(Ordering::Acquire)
    }

    fn reserve_connection(&self) -> HubResult<()> {
        let limit = self.inner.config.max_connections;
        self.inner
            .connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < limit).then_some(current + 1)
            })
            .map(|_| ())
            .map_err(|_| HubError::TooManyConnections(limit))
    }

    fn release_connections(&self, count: usize) {
        if count > 0 {
            self.inner.connections.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

/// A subscribed client as seen by a transport
///
/// Yields the client's frames in order and ends when the hub closes the
/// sink. Dropping it (e.g. because the connection went away) unsubscribes.
pub struct Subscription {
    manager: SubscriptionManager,
    handle: SubscriptionHandle,
    events: ClientStream,
}

impl Subscription {
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.events.recv().await
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.events.poll_next_unpin(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.unsubscribe(&self.handle);
    }
}
