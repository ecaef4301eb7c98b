//! Notification sinks.
//!
//! The executor never calls a [`NotificationSink`] itself. It pushes onto a
//! per-run [`DeliveryQueue`] whose worker task hands notifications to the sink
//! in order. Sinks are observers: an error, a panic or a stalled delivery is
//! logged and never changes the outcome of a run.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::events::Notification;

/// Capacity for the broadcast channel
const DEFAULT_CAPACITY: usize = 1000;

/// Longest a sink may take to accept one notification
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no subscribers attached")]
    NoSubscribers,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Ordered hand-off from one run to a sink
///
/// `push` never waits. A worker task delivers queued notifications one at a
/// time, each bounded by the delivery timeout.
pub struct DeliveryQueue {
    sender: mpsc::UnboundedSender<Notification>,
    worker: JoinHandle<()>,
    timeout: Duration,
}

impl DeliveryQueue {
    pub fn start(sink: Arc<dyn NotificationSink>, timeout: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Notification>();
        let worker = tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                deliver(sink.as_ref(), &notification, timeout).await;
            }
        });

        Self {
            sender,
            worker,
            timeout,
        }
    }

    pub fn push(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            debug!("Delivery worker gone, notification dropped");
        }
    }

    /// Stop accepting notifications and wait for the queued ones to go out
    ///
    /// Waits at most two delivery timeouts, enough to ride out one stalled
    /// delivery; whatever is still queued after that is dropped.
    pub async fn close(self) {
        let Self {
            sender,
            mut worker,
            timeout,
        } = self;
        drop(sender);

        if tokio::time::timeout(timeout * 2, &mut worker).await.is_err() {
            warn!("Notification sink too slow, dropping undelivered notifications");
            worker.abort();
        }
    }
}

async fn deliver(sink: &dyn NotificationSink, notification: &Notification, timeout: Duration) {
    let attempt = AssertUnwindSafe(sink.notify(notification)).catch_unwind();
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => debug!(error = %e, "Notification not delivered"),
        Ok(Err(_)) => warn!(kind = ?notification.kind, "Notification sink panicked"),
        Err(_) => warn!(kind = ?notification.kind, "Notification sink timed out"),
    }
}

/// Fans notifications out to any number of subscribers
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
    /// Number of notifications published (for monitoring)
    published: Arc<AtomicUsize>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Receive notifications for every run
    ///
    /// Notifications published before subscribing are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Receive notifications for one run only
    pub fn subscribe_run(&self, run_id: impl Into<String>) -> RunSubscription {
        RunSubscription {
            run_id: run_id.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn published(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastNotifier")
            .field("subscriber_count", &self.subscriber_count())
            .field("published", &self.published())
            .finish()
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(notification.clone())
            .map(|_| ())
            .map_err(|_| NotifyError::NoSubscribers)
    }
}

/// Receiver filtered to a single run id
pub struct RunSubscription {
    run_id: String,
    receiver: broadcast::Receiver<Notification>,
}

impl RunSubscription {
    /// Next notification for this run, or `None` once the notifier is gone
    ///
    /// Lagged receivers skip the notifications they missed.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) if notification.run_id == self.run_id => return Some(notification),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::events::NotificationKind;

    #[tokio::test]
    async fn publish_subscribe() {
        let notifier = BroadcastNotifier::new();
        let mut rx = notifier.subscribe();

        let sent = Notification::phase_started("run-1", 1, "Discovery & Planning");
        notifier.notify(&sent).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, sent.message);
        assert_eq!(notifier.published(), 1);
    }

    #[tokio::test]
    async fn notify_without_subscribers_reports_error() {
        let notifier = BroadcastNotifier::new();
        let result = notifier
            .notify(&Notification::new("run-1", 4, NotificationKind::PhaseStarted, "x"))
            .await;

        assert!(matches!(result, Err(NotifyError::NoSubscribers)));
    }

    #[tokio::test]
    async fn run_subscription_filters_other_runs() {
        let notifier = BroadcastNotifier::new();
        let mut subscription = notifier.subscribe_run("run-b");

        notifier
            .notify(&Notification::phase_started("run-a", 1, "Discovery & Planning"))
            .await
            .unwrap();
        notifier
            .notify(&Notification::phase_started("run-b", 1, "Discovery & Planning"))
            .await
            .unwrap();

        let received = subscription.recv().await.unwrap();
        assert_eq!(received.run_id, "run-b");
    }

    #[tokio::test]
    async fn subscription_ends_when_notifier_dropped() {
        let notifier = BroadcastNotifier::new();
        let mut subscription = notifier.subscribe_run("run-a");
        drop(notifier);

        assert!(subscription.recv().await.is_none());
    }

    /// Records notification phases; panics or stalls on the chosen phase
    struct FlakySink {
        seen: std::sync::Mutex<Vec<u8>>,
        panic_on: Option<u8>,
        hang_on: Option<u8>,
    }

    impl FlakySink {
        fn new(panic_on: Option<u8>, hang_on: Option<u8>) -> Arc<Self> {
            Arc::new(Self {
                seen: std::sync::Mutex::new(Vec::new()),
                panic_on,
                hang_on,
            })
        }
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            if self.panic_on == Some(notification.phase) {
                panic!("sink exploded");
            }
            if self.hang_on == Some(notification.phase) {
                std::future::pending::<()>().await;
            }
            self.seen.lock().unwrap().push(notification.phase);
            Ok(())
        }
    }

    fn started(phase: u8) -> Notification {
        Notification::phase_started("run-1", phase, "phase")
    }

    #[tokio::test]
    async fn queue_delivers_in_order_before_close_returns() {
        let sink = FlakySink::new(None, None);
        let queue = DeliveryQueue::start(sink.clone(), DEFAULT_DELIVERY_TIMEOUT);

        for phase in 1..=5 {
            queue.push(started(phase));
        }
        queue.close().await;

        assert_eq!(*sink.seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn panicking_sink_loses_only_its_notification() {
        let sink = FlakySink::new(Some(2), None);
        let queue = DeliveryQueue::start(sink.clone(), DEFAULT_DELIVERY_TIMEOUT);

        for phase in 1..=3 {
            queue.push(started(phase));
        }
        queue.close().await;

        assert_eq!(*sink.seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn stalled_sink_is_skipped_after_timeout() {
        let sink = FlakySink::new(None, Some(1));
        let queue = DeliveryQueue::start(sink.clone(), Duration::from_millis(100));
        let started_at = tokio::time::Instant::now();

        queue.push(started(1));
        queue.push(started(2));
        queue.close().await;

        assert!(started_at.elapsed() < Duration::from_secs(1));
        assert_eq!(*sink.seen.lock().unwrap(), vec![2]);
    }
}
