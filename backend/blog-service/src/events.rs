//! Post domain events
//!
//! The store reports what happened to a post through an [`EventSink`].
//! Emission is synchronous and never blocks: the production sink pushes into a
//! bounded channel that a single background task drains into the log, so a
//! burst of reads cannot spawn an unbounded number of logging tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics::EVENTS_DROPPED_TOTAL;

/// Something that happened to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostEvent {
    Created { post_id: String, author: String },
    Read { post_id: String, author: String },
    Updated { post_id: String, author: String },
    Deleted { post_id: String },
}

impl PostEvent {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Read { .. } => "read",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn post_id(&self) -> &str {
        match self {
            Self::Created { post_id, .. }
            | Self::Read { post_id, .. }
            | Self::Updated { post_id, .. }
            | Self::Deleted { post_id } => post_id,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            Self::Created { author, .. }
            | Self::Read { author, .. }
            | Self::Updated { author, .. } => Some(author),
            Self::Deleted { .. } => None,
        }
    }
}

/// Receives post events without blocking the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PostEvent);
}

/// Sink backed by a bounded mpsc channel.
///
/// A full or closed channel drops the event. Every drop is counted in
/// `blog_events_dropped_total`, but only the first drop of a burst is logged;
/// the next successful send logs how many events the burst lost.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<PostEvent>,
    dropping: Arc<AtomicBool>,
    dropped_in_burst: Arc<AtomicU64>,
}

impl ChannelEventSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PostEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let sink = Self {
            tx,
            dropping: Arc::new(AtomicBool::new(false)),
            dropped_in_burst: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// True between a dropped event and the next successful send.
    pub fn is_dropping(&self) -> bool {
        self.dropping.load(Ordering::Relaxed)
    }

    fn record_drop(&self, reason: &'static str, event: &PostEvent) {
        EVENTS_DROPPED_TOTAL.with_label_values(&[reason]).inc();
        self.dropped_in_burst.fetch_add(1, Ordering::Relaxed);

        if !self.dropping.swap(true, Ordering::Relaxed) {
            warn!(
                reason,
                post_id = %event.post_id(),
                action = event.action(),
                "post event channel {}, dropping events until it drains",
                reason
            );
        }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: PostEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                if self.dropping.swap(false, Ordering::Relaxed) {
                    let dropped = self.dropped_in_burst.swap(0, Ordering::Relaxed);
                    info!(dropped, "post event channel accepting events again");
                }
            }
            Err(TrySendError::Full(event)) => self.record_drop("full", &event),
            Err(TrySendError::Closed(event)) => self.record_drop("closed", &event),
        }
    }
}

/// Write a post event as a structured log record.
pub fn log_event(event: &PostEvent) {
    match event.author() {
        Some(author) => info!(
            post_id = %event.post_id(),
            author = %author,
            action = event.action(),
            "post {}",
            event.action()
        ),
        None => info!(
            post_id = %event.post_id(),
            action = event.action(),
            "post {}",
            event.action()
        ),
    }
}

/// Spawn the task that drains the event channel into the log.
///
/// The task ends once every [`ChannelEventSink`] clone has been dropped.
pub fn spawn_event_logger(mut rx: mpsc::Receiver<PostEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
        tracing::debug!("post event channel closed, event logger exiting");
    })
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: PostEvent) {}
}

/// Sink that keeps every event in memory, for inspection in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<PostEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<PostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: PostEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: &str) -> PostEvent {
        PostEvent::Created {
            post_id: id.to_string(),
            author: "alice".to_string(),
        }
    }

    #[test]
    fn test_event_accessors() {
        let event = created("p1");
        assert_eq!(event.action(), "created");
        assert_eq!(event.post_id(), "p1");
        assert_eq!(event.author(), Some("alice"));

        let deleted = PostEvent::Deleted {
            post_id: "p2".to_string(),
        };
        assert_eq!(deleted.action(), "deleted");
        assert_eq!(deleted.author(), None);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (sink, mut rx) = ChannelEventSink::new(4);
        sink.emit(created("p1"));
        sink.emit(created("p2"));

        assert_eq!(rx.recv().await, Some(created("p1")));
        assert_eq!(rx.recv().await, Some(created("p2")));
    }

    #[tokio::test]
    async fn test_full_channel_counts_drop_without_blocking() {
        let (sink, mut rx) = ChannelEventSink::new(1);
        let before = EVENTS_DROPPED_TOTAL.with_label_values(&["full"]).get();

        sink.emit(created("kept"));
        sink.emit(created("dropped"));

        let after = EVENTS_DROPPED_TOTAL.with_label_values(&["full"]).get();
        assert!(after > before);
        assert_eq!(rx.recv().await, Some(created("kept")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_burst_is_flagged_until_channel_drains() {
        let (sink, mut rx) = ChannelEventSink::new(1);
        let before = EVENTS_DROPPED_TOTAL.with_label_values(&["full"]).get();

        sink.emit(created("kept"));
        assert!(!sink.is_dropping());

        for i in 0..50 {
            sink.emit(created(&format!("burst-{i}")));
        }

        // Every drop is counted even though only the first one is logged
        let after = EVENTS_DROPPED_TOTAL.with_label_values(&["full"]).get();
        assert!(after >= before + 50);
        assert!(sink.is_dropping());
        assert_eq!(sink.dropped_in_burst.load(Ordering::Relaxed), 50);
        assert!(sink.clone().is_dropping());

        assert_eq!(rx.recv().await, Some(created("kept")));
        sink.emit(created("after"));

        assert!(!sink.is_dropping());
        assert_eq!(sink.dropped_in_burst.load(Ordering::Relaxed), 0);
        assert_eq!(rx.recv().await, Some(created("after")));
    }

    #[tokio::test]
    async fn test_closed_channel_counts_drop() {
        let (sink, rx) = ChannelEventSink::new(1);
        drop(rx);
        let before = EVENTS_DROPPED_TOTAL.with_label_values(&["closed"]).get();

        sink.emit(created("p1"));

        let after = EVENTS_DROPPED_TOTAL.with_label_values(&["closed"]).get();
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_event_logger_exits_when_senders_drop() {
        let (sink, rx) = ChannelEventSink::new(8);
        let handle = spawn_event_logger(rx);

        sink.emit(created("p1"));
        drop(sink);

        handle.await.expect("event logger task panicked");
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryEventSink::new();
        sink.emit(created("a"));
        sink.emit(created("b"));

        let ids: Vec<_> = sink
            .events()
            .iter()
            .map(|event| event.post_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
