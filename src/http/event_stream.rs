//! Event-stream registry.
//!
//! # Responsibilities
//! - Map stream identifiers to the outbound channel of an open SSE connection
//! - Let application code push messages into a stream without blocking
//! - Tear a stream down when a push cannot be delivered
//!
//! # Design Decisions
//! - One registry per server, cloned (Arc) into whatever needs to push
//! - A single mutex guards lookup/insert/delete; it is never held across I/O
//! - Removing an entry drops the only sender, which closes the channel and
//!   ends the streaming loop on the connection side

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::observability::metrics;

/// Receiving side of a registered stream, owned by the streaming connection.
#[derive(Debug)]
pub struct EventStream {
    identifier: String,
    generation: u64,
    receiver: mpsc::Receiver<String>,
}

impl EventStream {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Wait for the next message. `None` once the stream has been closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

/// What happened to a pushed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued for the streaming connection.
    Delivered,
    /// No stream is registered under the identifier.
    Unknown,
    /// The receiver was gone or its buffer full; the stream was closed.
    Dropped,
}

impl PushOutcome {
    fn as_str(self) -> &'static str {
        match self {
            PushOutcome::Delivered => "delivered",
            PushOutcome::Unknown => "unknown",
            PushOutcome::Dropped => "dropped",
        }
    }
}

struct Entry {
    generation: u64,
    sender: mpsc::Sender<String>,
}

/// Process-wide map from stream identifier to outbound channel.
#[derive(Clone)]
pub struct EventStreamRegistry {
    streams: Arc<Mutex<HashMap<String, Entry>>>,
    next_generation: Arc<AtomicU64>,
    shut_down: Arc<AtomicBool>,
    capacity: usize,
}

impl EventStreamRegistry {
    /// Create a registry whose streams buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            streams: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(1)),
            shut_down: Arc::new(AtomicBool::new(false)),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a stream under `identifier` and return its receiving side.
    ///
    /// An existing stream with the same identifier is replaced, which closes it.
    /// After [`close_all`](Self::close_all) the returned stream is already closed
    /// and nothing is registered.
    pub fn open(&self, identifier: &str) -> EventStream {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let stream = EventStream {
            identifier: identifier.to_string(),
            generation,
            receiver,
        };

        let mut streams = self.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            drop(streams);
            tracing::debug!(stream = %identifier, "Registry shut down, refusing event stream");
            return stream;
        }
        let replaced = streams
            .insert(identifier.to_string(), Entry { generation, sender })
            .is_some();
        drop(streams);

        if replaced {
            tracing::debug!(stream = %identifier, "Replaced existing event stream");
        } else {
            metrics::record_stream_opened();
        }
        stream
    }

    /// Push `message` to the stream registered under `identifier`.
    ///
    /// Never blocks. Pushing to an unknown identifier is a no-op; a push that
    /// cannot be queued deregisters and closes the stream.
    pub fn send(&self, identifier: &str, message: impl Into<String>) -> PushOutcome {
        let mut streams = self.lock();
        let attempt = streams
            .get(identifier)
            .map(|entry| entry.sender.try_send(message.into()));

        let outcome = match attempt {
            None => PushOutcome::Unknown,
            Some(Ok(())) => PushOutcome::Delivered,
            Some(Err(TrySendError::Full(_) | TrySendError::Closed(_))) => {
                streams.remove(identifier);
                metrics::record_stream_closed();
                tracing::debug!(stream = %identifier, "Event stream not ready, closing it");
                PushOutcome::Dropped
            }
        };
        drop(streams);

        metrics::record_push(outcome.as_str());
        outcome
    }

    /// Deregister `identifier`, closing its stream. Returns whether it existed.
    pub fn close(&self, identifier: &str) -> bool {
        let removed = self.lock().remove(identifier).is_some();
        if removed {
            metrics::record_stream_closed();
        }
        removed
    }

    /// Close every registered stream and refuse new ones from now on.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut streams = self.lock();
            self.shut_down.store(true, Ordering::SeqCst);
            streams.drain().collect()
        };
        for _ in &drained {
            metrics::record_stream_closed();
        }
        drained.len()
    }

    /// Remove the registration owned by `stream`, if it has not been replaced.
    pub(crate) fn release(&self, stream: &EventStream) {
        let mut streams = self.lock();
        let owned = streams
            .get(&stream.identifier)
            .is_some_and(|entry| entry.generation == stream.generation);
        if owned {
            streams.remove(&stream.identifier);
            metrics::record_stream_closed();
        }
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for EventStreamRegistry {
    fn default() -> Self {
        Self::new(16)
    }
}

impl std::fmt::Debug for EventStreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamRegistry")
            .field("streams", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_reaches_open_stream() {
        let registry = EventStreamRegistry::default();
        let mut stream = registry.open("s1");

        assert_eq!(registry.send("s1", "hello"), PushOutcome::Delivered);
        assert_eq!(stream.recv().await.as_deref(), Some("hello"));
        assert_eq!(stream.identifier(), "s1");
    }

    #[test]
    fn push_to_unknown_identifier_is_a_noop() {
        let registry = EventStreamRegistry::default();
        assert_eq!(registry.send("nobody", "hi"), PushOutcome::Unknown);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn full_channel_closes_the_stream() {
        let registry = EventStreamRegistry::new(1);
        let mut stream = registry.open("s1");

        assert_eq!(registry.send("s1", "one"), PushOutcome::Delivered);
        assert_eq!(registry.send("s1", "two"), PushOutcome::Dropped);
        assert!(!registry.contains("s1"));

        assert_eq!(stream.recv().await.as_deref(), Some("one"));
        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn push_after_receiver_gone_deregisters() {
        let registry = EventStreamRegistry::default();
        drop(registry.open("s1"));

        assert_eq!(registry.send("s1", "late"), PushOutcome::Dropped);
        assert_eq!(registry.send("s1", "later"), PushOutcome::Unknown);
    }

    #[tokio::test]
    async fn reopening_replaces_and_closes_previous() {
        let registry = EventStreamRegistry::default();
        let mut first = registry.open("s1");
        let mut second = registry.open("s1");

        assert_eq!(first.recv().await, None);
        assert_eq!(registry.send("s1", "x"), PushOutcome::Delivered);
        assert_eq!(second.recv().await.as_deref(), Some("x"));

        // The stale stream must not tear down its replacement.
        registry.release(&first);
        assert!(registry.contains("s1"));
        registry.release(&second);
        assert!(!registry.contains("s1"));
    }

    #[tokio::test]
    async fn close_all_ends_every_stream() {
        let registry = EventStreamRegistry::default();
        let mut a = registry.open("a");
        let mut b = registry.open("b");

        assert!(registry.close("a"));
        assert!(!registry.close("a"));
        assert_eq!(registry.close_all(), 1);

        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
    }

    #[tokio::test]
    async fn open_after_close_all_is_refused() {
        let registry = EventStreamRegistry::default();
        assert_eq!(registry.close_all(), 0);
        assert!(registry.is_shut_down());

        let mut late = registry.open("late");
        assert!(!registry.contains("late"));
        assert_eq!(registry.send("late", "x"), PushOutcome::Unknown);
        assert_eq!(late.recv().await, None);
    }
}
