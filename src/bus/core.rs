//! # Event bus engine: fan-out and filtering.
//!
//! [`EventBus`] owns the set of live subscriptions and offers every
//! published envelope to each matching one.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscribers (many):
//!   task 1 ──┐                     ┌──► [queue 1] ──► Subscription<A>.recv()
//!   task 2 ──┼──► publish() ───────┼──► [queue 2] ──► Subscription<A>.recv()
//!   task N ──┘    (filter + fan-out)└──► [queue 3] ──► Subscription<B>.recv()
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` enqueues and returns; it never
//!   waits for any consumer.
//! - **Broadcast, not load-balanced**: every matching subscription gets its
//!   own copy of every envelope.
//! - **No replay**: a subscription only observes envelopes published after
//!   it was created.
//! - **Per-subscription FIFO**: externally ordered publishes are observed
//!   in order by each individual subscription. No ordering is defined
//!   across subscriptions.
//! - **Isolation**: a slow, canceled, or panicking consumer never affects
//!   the publisher or other subscriptions.
//!
//! ## Buffering
//! By default every subscription gets an unbounded queue: a slow consumer
//! accumulates envelopes rather than dropping them or blocking the
//! publisher. [`EventBus::with_capacity`] opts into bounded queues where a
//! full queue terminates that subscription instead (loud, never a silent
//! drop); see the method docs.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bus::subscription::{Subscription, SubscriptionReceiver};
use crate::error::BusError;
use crate::events::{AnyEnvelope, Envelope};

/// Delivery side of one subscription's queue.
enum EntrySender {
    Unbounded(mpsc::UnboundedSender<AnyEnvelope>),
    Bounded(mpsc::Sender<AnyEnvelope>),
}

/// One live subscription as seen by the publish path: its filter predicate
/// fields plus the sending half of its queue.
struct SubscriberEntry {
    id: u64,
    type_id: TypeId,
    correlation: Option<Arc<str>>,
    sender: EntrySender,
}

impl SubscriberEntry {
    fn matches(&self, envelope: &AnyEnvelope) -> bool {
        self.type_id == envelope.type_id
            && self
                .correlation
                .as_deref()
                .map_or(true, |id| *id == *envelope.correlation_id)
    }
}

/// Shared bus state: the live-subscription set and the id counter.
///
/// Subscriptions hold a `Weak` reference back here so dropping one can
/// deregister itself without keeping the bus alive.
pub(crate) struct BusInner {
    entries: Mutex<Vec<SubscriberEntry>>,
    next_id: AtomicU64,
    capacity: Option<usize>,
}

impl BusInner {
    /// Removes a subscription entry; called from `Subscription::drop`.
    pub(crate) fn remove(&self, id: u64) {
        let mut entries = self.lock_entries();
        entries.retain(|entry| entry.id != id);
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<SubscriberEntry>> {
        // Critical sections never panic, but don't propagate poison if
        // something upstream ever changes that.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process publish/subscribe bus for correlation-tagged envelopes.
///
/// Cheap to clone (internally `Arc`-backed); clones publish into and
/// subscribe from the same subscription set. Safe to share across tasks
/// and threads without external locking.
///
/// ### Example
/// ```
/// use corrbus::{Envelope, EventBus};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let bus = EventBus::new();
///     let mut orders = bus.subscribe::<String>();
///
///     bus.publish(Envelope::generate("order-created".to_string()));
///
///     let envelope = orders.recv().await.unwrap();
///     assert_eq!(envelope.value(), "order-created");
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus whose subscriptions buffer without bound.
    ///
    /// A consumer that drains slower than the publish rate accumulates
    /// envelopes in its own queue; the publisher never blocks and nothing
    /// is dropped. Memory is the only limit, so long-lived subscriptions
    /// should keep draining.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                capacity: None,
            }),
        }
    }

    /// Creates a bus whose subscriptions buffer at most `capacity` envelopes.
    ///
    /// ### Overflow behavior
    /// When a publish finds a subscription's queue full, that subscription
    /// is **terminated**: its entry is removed, its queue closes after the
    /// buffered envelopes are drained, and a warning is logged. Envelopes
    /// are never silently skipped for a live subscription.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                capacity: Some(capacity.max(1)),
            }),
        }
    }

    /// Publishes an envelope to every matching live subscription.
    ///
    /// - Synchronous and non-blocking: returns once the envelope is
    ///   enqueued for every matching subscription.
    /// - Subscriptions created after this call never see the envelope.
    /// - If nothing matches, the envelope is dropped.
    pub fn publish<T: Send + Sync + 'static>(&self, envelope: Envelope<T>) {
        let envelope = envelope.erase();
        debug!(
            correlation_id = %envelope.correlation_id,
            payload = std::any::type_name::<T>(),
            "publishing envelope"
        );

        let mut entries = self.inner.lock_entries();
        entries.retain(|entry| {
            if !entry.matches(&envelope) {
                return true;
            }
            match &entry.sender {
                EntrySender::Unbounded(tx) => tx.send(envelope.clone()).is_ok(),
                EntrySender::Bounded(tx) => match tx.try_send(envelope.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            subscription = entry.id,
                            "subscription queue full; terminating subscription"
                        );
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                },
            }
        });
    }

    /// Subscribes to every envelope whose payload is of type `T`.
    ///
    /// Each call creates an independent subscription with its own queue;
    /// publishing fans out to all of them. The returned stream is infinite
    /// until the subscription is dropped (or terminated on overflow in
    /// bounded mode); it never completes on its own.
    pub fn subscribe<T: Send + Sync + 'static>(&self) -> Subscription<T> {
        self.register(None)
    }

    /// Subscribes to envelopes of type `T` carrying exactly this correlation id.
    ///
    /// Equivalent to [`subscribe`](Self::subscribe) plus an exact string
    /// equality check on the correlation id. Returns
    /// [`BusError::EmptyCorrelationId`] if the id is empty.
    pub fn subscribe_correlated<T: Send + Sync + 'static>(
        &self,
        correlation_id: impl Into<Arc<str>>,
    ) -> Result<Subscription<T>, BusError> {
        let correlation_id = correlation_id.into();
        if correlation_id.is_empty() {
            return Err(BusError::EmptyCorrelationId);
        }
        Ok(self.register(Some(correlation_id)))
    }

    /// Number of currently live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.lock_entries().len()
    }

    fn register<T: Send + Sync + 'static>(
        &self,
        correlation: Option<Arc<str>>,
    ) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let (sender, receiver) = match self.inner.capacity {
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (
                    EntrySender::Unbounded(tx),
                    SubscriptionReceiver::Unbounded(rx),
                )
            }
            Some(capacity) => {
                let (tx, rx) = mpsc::channel(capacity);
                (EntrySender::Bounded(tx), SubscriptionReceiver::Bounded(rx))
            }
        };

        debug!(
            subscription = id,
            payload = std::any::type_name::<T>(),
            correlation_id = correlation.as_deref(),
            "registering subscription"
        );
        self.inner.lock_entries().push(SubscriberEntry {
            id,
            type_id: TypeId::of::<T>(),
            correlation,
            sender,
        });

        Subscription {
            id,
            receiver,
            bus: Arc::downgrade(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}
