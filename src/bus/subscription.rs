//! # Consumer side of one bus registration.
//!
//! [`Subscription`] is the receiving half handed out by
//! [`EventBus::subscribe`](crate::EventBus::subscribe): a private FIFO
//! queue fed by the publish-time fan-out, drained at the consumer's own
//! pace.
//!
//! ## Rules
//! - **Infinite**: the stream never completes while the bus and the
//!   registration are alive; it only ends after cancellation (drop),
//!   overflow termination in bounded mode, or the bus being dropped.
//! - **Cancellation**: dropping the subscription deregisters it from the
//!   bus; no further envelopes are delivered and its queue is released.
//!   Other subscriptions are unaffected.
//! - **Not restartable**: re-subscribing yields a fresh registration that
//!   only observes future envelopes.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::bus::core::BusInner;
use crate::events::{AnyEnvelope, Envelope};

/// Queue half owned by the consumer; bounded or unbounded to match the
/// bus it came from.
pub(crate) enum SubscriptionReceiver {
    Unbounded(mpsc::UnboundedReceiver<AnyEnvelope>),
    Bounded(mpsc::Receiver<AnyEnvelope>),
}

impl SubscriptionReceiver {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<AnyEnvelope>> {
        match self {
            SubscriptionReceiver::Unbounded(rx) => rx.poll_recv(cx),
            SubscriptionReceiver::Bounded(rx) => rx.poll_recv(cx),
        }
    }

    fn try_recv(&mut self) -> Result<AnyEnvelope, mpsc::error::TryRecvError> {
        match self {
            SubscriptionReceiver::Unbounded(rx) => rx.try_recv(),
            SubscriptionReceiver::Bounded(rx) => rx.try_recv(),
        }
    }
}

/// A live registration delivering filtered envelopes to one consumer.
///
/// Envelopes arrive in the relative order their publishes were externally
/// ordered in. Consume via [`recv`](Self::recv),
/// [`try_recv`](Self::try_recv), or the [`Stream`] impl.
pub struct Subscription<T> {
    pub(crate) id: u64,
    pub(crate) receiver: SubscriptionReceiver,
    pub(crate) bus: Weak<BusInner>,
    pub(crate) _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Receives the next matching envelope, waiting if none is queued.
    ///
    /// Returns `None` once the subscription has ended (bus dropped, or
    /// this subscription was terminated on overflow) and its queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Envelope<T>> {
        loop {
            let envelope = match &mut self.receiver {
                SubscriptionReceiver::Unbounded(rx) => rx.recv().await?,
                SubscriptionReceiver::Bounded(rx) => rx.recv().await?,
            };
            if let Some(envelope) = envelope.downcast::<T>() {
                return Some(envelope);
            }
            // Entries are TypeId-filtered at publish time; reaching this
            // point means a bug in the fan-out path.
            debug_assert!(false, "queue delivered a foreign payload type");
        }
    }

    /// Receives the next queued envelope without waiting.
    pub fn try_recv(&mut self) -> Result<Envelope<T>, mpsc::error::TryRecvError> {
        loop {
            let envelope = self.receiver.try_recv()?;
            if let Some(envelope) = envelope.downcast::<T>() {
                return Ok(envelope);
            }
            debug_assert!(false, "queue delivered a foreign payload type");
        }
    }
}

impl<T: Send + Sync + 'static> Stream for Subscription<T> {
    type Item = Envelope<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.receiver.poll_recv(cx) {
                Poll::Ready(Some(envelope)) => {
                    if let Some(envelope) = envelope.downcast::<T>() {
                        return Poll::Ready(Some(envelope));
                    }
                    debug_assert!(false, "queue delivered a foreign payload type");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("payload", &std::any::type_name::<T>())
            .finish()
    }
}
