//! One shared broadcast group for every observer.
//!
//! ```text
//! publisher ──► NotificationHub ──try_send──► subscriber queue ──► socket
//!                  │                          subscriber queue ──► socket
//!                  └─ DashMap<SubscriberId, Sender>
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::Notification;

/// Queue depth used when none is configured.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Handle naming one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The receiving end handed to an observer.
///
/// Dropping it closes the queue; the hub forgets the subscriber on its next
/// publish.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Notification>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next notification. `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.recv().await
    }

    /// Returns the next queued notification without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.try_recv().ok()
    }
}

/// What happened to one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Queued for this many observers.
    pub delivered: usize,
    /// Skipped for observers whose queue was full.
    pub dropped: usize,
    /// Observers found gone and removed.
    pub disconnected: usize,
}

/// Registry of observers and the fan-out over them.
///
/// Every observer owns a bounded queue. `publish` never waits: an observer
/// that has fallen behind misses the notification, one that went away is
/// unregistered, and neither affects delivery to the rest. Observers that
/// subscribe after a publish do not see it.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    subscribers: Arc<DashMap<SubscriberId, mpsc::Sender<Arc<Notification>>>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl NotificationHub {
    /// Creates a hub whose observers each queue up to `buffer` notifications.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    /// Registers a new observer.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.subscribers.insert(id, sender);
        tracing::debug!(subscriber = %id, "observer subscribed");
        Subscription { id, receiver }
    }

    /// Removes an observer. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "observer unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queues `notification` for every registered observer.
    pub fn publish(&self, notification: Notification) -> DeliveryReport {
        let kind = notification.kind();
        let notification = Arc::new(notification);

        // Copy the senders out so no shard lock is held while queueing.
        let targets: Vec<_> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, sender) in targets {
            match sender.try_send(Arc::clone(&notification)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    metrics::counter!("notifications_dropped_total").increment(1);
                    tracing::warn!(subscriber = %id, kind, "observer queue full, notification dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    if self.unsubscribe(id) {
                        report.disconnected += 1;
                    }
                }
            }
        }

        metrics::counter!("notifications_published_total", "type" => kind).increment(1);
        tracing::debug!(
            kind,
            order_id = %notification.order_id(),
            delivered = report.delivered,
            dropped = report.dropped,
            "notification published"
        );
        report
    }

    /// Publishes each notification in turn.
    pub fn publish_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.publish(notification);
        }
    }
}
