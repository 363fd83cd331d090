//! Per-Stream Broadcaster
//!
//! One task per live stream instance. On every tick it asks the generator
//! for the next payload, encodes it once and writes it to a snapshot of the
//! stream's sinks. Sinks that fail or stall are pruned afterwards through the
//! subscription manager, which also retires the stream when it empties.
//!
//! The task stops when its cancellation token fires, when a tick finds no
//! clients, or after a terminal payload and its grace period.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::manager::SubscriptionManager;
use super::messages::{Frame, StreamEvent};
use super::registry::{StreamEntry, Ticker};
use super::sink::{ClientId, ClientSink};

enum TickOutcome {
    Continue,
    Finished,
}

pub(crate) struct Broadcaster {
    manager: SubscriptionManager,
    entry: Arc<StreamEntry>,
    cancel: CancellationToken,
}

impl Broadcaster {
    /// Spawn the ticker for `entry`
    ///
    /// Called by the subscription manager while it holds the stream lock.
    pub(crate) fn start(manager: SubscriptionManager, entry: Arc<StreamEntry>) -> Ticker {
        let cancel = manager.child_token();
        let broadcaster = Self {
            manager,
            entry,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(broadcaster.run());

        Ticker { cancel, task }
    }

    async fn run(self) {
        let period = self.manager.config().tick_interval;

        tracing::info!(
            stream = %self.entry.id(),
            instance = self.entry.instance(),
            generator = self.manager.generator().name(),
            interval_ms = period.as_millis() as u64,
            "Broadcaster started"
        );

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let TickOutcome::Finished = self.tick().await {
                break;
            }
        }

        tracing::info!(
            stream = %self.entry.id(),
            instance = self.entry.instance(),
            "Broadcaster stopped"
        );
    }

    async fn tick(&self) -> TickOutcome {
        let config = self.manager.config();
        let stream_id = self.entry.id().as_str();

        let prepared = {
            let mut state = self.entry.lock();
            if state.clients.is_empty() {
                None
            } else {
                let generated = self.manager.generator().next(stream_id, state.cursor);
                state.cursor = generated.cursor;
                if generated.terminal {
                    // Subscribers arriving from now on get a fresh instance
                    self.entry.mark_closed();
                }

                let event = StreamEvent::new(
                    generated.payload.kind,
                    stream_id,
                    generated.payload.fields,
                );
                Some((Frame::encode(&event), state.clients.clone(), generated.terminal))
            }
        };

        let Some((encoded, sinks, terminal)) = prepared else {
            tracing::debug!(stream = %stream_id, "No clients left, stopping broadcaster");
            self.manager.retire(&self.entry);
            return TickOutcome::Finished;
        };

        match encoded {
            Ok(frame) => {
                let failed = deliver(&frame, &sinks, config.write_timeout).await;
                if !failed.is_empty() {
                    tracing::warn!(
                        stream = %stream_id,
                        failed = failed.len(),
                        "Pruning clients that failed to receive"
                    );
                    self.manager.detach(&self.entry, &failed);
                }

                tracing::debug!(
                    stream = %stream_id,
                    delivered = sinks.len() - failed.len(),
                    terminal,
                    "Tick broadcast"
                );
            }
            Err(e) => {
                tracing::error!(stream = %stream_id, error = %e, "Failed to encode event, skipping tick");
            }
        }
        drop(sinks);

        if terminal {
            tracing::info!(
                stream = %stream_id,
                grace_ms = config.grace_period.as_millis() as u64,
                "Terminal event sent, closing stream after grace period"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {}
                () = tokio::time::sleep(config.grace_period) => {}
            }

            self.manager.retire(&self.entry);
            return TickOutcome::Finished;
        }

        TickOutcome::Continue
    }
}

/// Write `frame` to every sink concurrently
///
/// Returns the clients whose write failed or timed out. A failing sink never
/// prevents delivery to the others.
pub async fn deliver(frame: &Frame, sinks: &[ClientSink], timeout: Duration) -> Vec<ClientId> {
    let writes = sinks.iter().map(|sink| async move {
        sink.send(frame.clone(), timeout)
            .await
            .err()
            .map(|err| (sink.id(), err))
    });

    join_all(writes)
        .await
        .into_iter()
        .flatten()
        .map(|(client, err)| {
            tracing::debug!(client = %client, error = %err, "Client write failed");
            client
        })
        .collect()
}
