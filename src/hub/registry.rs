//! Stream Registry
//!
//! Maps stream identifiers to the live [`StreamEntry`] instance serving them.
//!
//! Each entry is one *instance* of a stream: once an instance is retired
//! (last client gone, or terminal payload delivered) it is marked closed and
//! never reused. A subscribe that races with retirement gets a fresh instance
//! from [`StreamRegistry::get_or_create`], and removal only ever deletes the
//! exact instance that asked for it, so a late teardown cannot evict a stream
//! that was just recreated under the same id.
//!
//! The registry map and each entry's state are guarded by separate locks and
//! neither is held while acquiring the other.

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{HubError, HubResult};
use super::generator::Cursor;
use super::sink::{ClientId, ClientSink};

/// Validated stream identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(String);

impl StreamId {
    /// Accept any identifier that is not empty or whitespace-only
    pub fn parse(raw: impl Into<String>) -> HubResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(HubError::InvalidStreamId(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ownership handle for a running per-stream broadcaster task
#[derive(Debug)]
pub(crate) struct Ticker {
    pub(crate) cancel: CancellationToken,
    pub(crate) task: JoinHandle<()>,
}

/// Mutable state of one stream instance
#[derive(Debug, Default)]
pub struct StreamState {
    pub(crate) clients: Vec<ClientSink>,
    pub(crate) cursor: Cursor,
    pub(crate) ticker: Option<Ticker>,
}

impl StreamState {
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.clients.iter().any(|c| c.id() == client)
    }
}

/// One instance of a broadcast stream
#[derive(Debug)]
pub struct StreamEntry {
    id: StreamId,
    instance: u64,
    closed: AtomicBool,
    state: Mutex<StreamState>,
}

impl StreamEntry {
    fn new(id: StreamId, instance: u64) -> Self {
        Self {
            id,
            instance,
            closed: AtomicBool::new(false),
            state: Mutex::new(StreamState::default()),
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Registry-wide sequence number distinguishing instances of the same id
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Closed instances accept no new clients
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Must be called with the state lock held
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock()
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        let state = self.lock();
        StreamSnapshot {
            stream_id: self.id.to_string(),
            instance: self.instance,
            clients: state.client_count(),
            running: state.is_running(),
            closed: self.is_closed(),
        }
    }
}

/// Point-in-time view of a stream, for introspection endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    pub stream_id: String,
    pub instance: u64,
    pub clients: usize,
    pub running: bool,
    pub closed: bool,
}

/// Registry of live stream instances
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Mutex<HashMap<StreamId, Arc<StreamEntry>>>,
    next_instance: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live instance for `id`, creating one if the slot is empty
    /// or holds a closed instance
    pub fn get_or_create(&self, id: &StreamId) -> Arc<StreamEntry> {
        let mut streams = self.streams.lock();

        if let Some(entry) = streams.get(id) {
            if !entry.is_closed() {
                return Arc::clone(entry);
            }
        }

        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = Arc::new(StreamEntry::new(id.clone(), instance));
        streams.insert(id.clone(), Arc::clone(&entry));

        tracing::debug!(stream = %id, instance, "Stream instance created");
        entry
    }

    pub fn get(&self, id: &str) -> Option<Arc<StreamEntry>> {
        let id = StreamId::parse(id).ok()?;
        self.streams.lock().get(&id).cloned()
    }

    /// Remove `entry` if its id still maps to this exact instance
    ///
    /// Returns whether anything was removed.
    pub fn remove_instance(&self, entry: &Arc<StreamEntry>) -> bool {
        let mut streams = self.streams.lock();

        match streams.get(entry.id()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                streams.remove(entry.id());
                tracing::debug!(
                    stream = %entry.id(),
                    instance = entry.instance(),
                    "Stream instance removed"
                );
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All registered instances
    pub fn entries(&self) -> Vec<Arc<StreamEntry>> {
        self.streams.lock().values().cloned().collect()
    }

    /// Empty the registry, returning every instance it held
    pub fn drain(&self) -> Vec<Arc<StreamEntry>> {
        self.streams.lock().drain().map(|(_, entry)| entry).collect()
    }

    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
