//! Progress broadcast channel
//!
//! Fans out progress text to every connected observer, regardless of which
//! job or stage produced it. Delivery is best-effort:
//! - each observer sees events in publish order
//! - the publisher never waits for observers
//! - observers that connect late see nothing published before they subscribed
//! - an observer that falls more than `capacity` events behind skips the gap

use crate::types::ProgressEvent;
use std::sync::OnceLock;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;

/// Events buffered per observer when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 1000;

static GLOBAL_HUB: OnceLock<ProgressHub> = OnceLock::new();

/// Publish/subscribe hub for [`ProgressEvent`]s
///
/// Cloning is cheap; clones share the same channel.
///
/// # Examples
///
/// ```
/// use audio_fetch::progress::ProgressHub;
///
/// # #[tokio::main]
/// # async fn main() {
/// let hub = ProgressHub::new(16);
/// let mut observer = hub.subscribe();
///
/// hub.publish("Starting download...");
///
/// let event = observer.recv().await.unwrap();
/// assert_eq!(event.text, "Starting download...");
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ProgressHub {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressHub {
    /// Create a standalone hub buffering up to `capacity` events per observer
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Initialize the process-wide hub
    ///
    /// The first call creates the hub with `capacity`; later calls return the
    /// existing hub unchanged. Safe to call from concurrent tasks.
    pub fn init_global(capacity: usize) -> &'static ProgressHub {
        GLOBAL_HUB.get_or_init(|| {
            tracing::debug!(capacity, "progress hub initialized");
            ProgressHub::new(capacity)
        })
    }

    /// The process-wide hub, created with [`DEFAULT_CAPACITY`] on first use
    pub fn global() -> &'static ProgressHub {
        Self::init_global(DEFAULT_CAPACITY)
    }

    /// Send an event to every current observer
    ///
    /// Returns the number of observers the event was queued for. With no
    /// observers the event is dropped.
    pub fn publish(&self, event: impl Into<ProgressEvent>) -> usize {
        // send() only fails when nobody is subscribed
        self.sender.send(event.into()).unwrap_or(0)
    }

    /// Attach a new observer
    pub fn subscribe(&self) -> ObserverHandle {
        ObserverHandle {
            receiver: self.sender.subscribe(),
        }
    }

    /// Detach an observer
    ///
    /// Equivalent to dropping the handle.
    pub fn unsubscribe(&self, handle: ObserverHandle) {
        drop(handle);
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A connected observer of a [`ProgressHub`]
#[derive(Debug)]
pub struct ObserverHandle {
    receiver: broadcast::Receiver<ProgressEvent>,
}

impl ObserverHandle {
    /// Wait for the next event
    ///
    /// Skips over events lost to lag. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "progress observer lagged, events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "progress observer lagged, events skipped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a `Stream`, e.g. for server-sent events
    pub fn into_stream(self) -> BroadcastStream<ProgressEvent> {
        BroadcastStream::new(self.receiver)
    }
}
