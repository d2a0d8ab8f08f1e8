//! # Handler worker: per-handler delivery loop with panic isolation.
//!
//! [`EventBus::attach`] bridges the pull-style [`Subscription`] to the
//! push-style [`Handler`] trait.
//!
//! ## Architecture
//! ```text
//! attach(handler)
//!     │
//!     └──► subscribe::<T>() ──► worker task ──► handler.on_event()
//!                                   └─────────► panic → warn, continue
//! ```
//!
//! ## Panic handling
//! The worker wraps every `on_event` call in `catch_unwind`:
//! - the panic is caught and logged, the worker moves to the next envelope;
//! - the publisher and every other subscription are unaffected.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave the handler's
//! shared state inconsistent if it panics while holding a lock.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::{EventBus, Subscription};
use crate::error::BusError;
use crate::handlers::Handler;

/// Owner handle for one attached handler's worker task.
///
/// Dropping the guard cancels the worker; [`shutdown`](Self::shutdown)
/// does the same but waits for it to finish.
pub struct HandlerGuard {
    token: CancellationToken,
    worker: JoinHandle<()>,
}

impl HandlerGuard {
    fn spawn<T: Send + Sync + 'static>(
        mut subscription: Subscription<T>,
        handler: Arc<dyn Handler<T>>,
    ) -> Self {
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_token.cancelled() => break,
                    next = subscription.recv() => {
                        let Some(envelope) = next else { break };
                        let fut = handler.on_event(&envelope);
                        if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                            warn!(
                                handler = handler.name(),
                                panic = %panic_message(&panic),
                                "handler panicked while processing envelope"
                            );
                        }
                    }
                }
            }
        });

        Self { token, worker }
    }

    /// Stops delivery without waiting for the worker to exit.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels the worker and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let _ = (&mut self.worker).await;
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for HandlerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerGuard")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl EventBus {
    /// Attaches a push-style handler for envelopes of type `T`.
    ///
    /// Creates a fresh subscription and spawns a worker task that drains
    /// it, invoking the handler per envelope with panic isolation. The
    /// returned guard owns the worker; drop or shut it down to detach.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<T: Send + Sync + 'static>(&self, handler: Arc<dyn Handler<T>>) -> HandlerGuard {
        HandlerGuard::spawn(self.subscribe::<T>(), handler)
    }

    /// Attaches a handler filtered on an exact correlation id.
    ///
    /// Returns [`BusError::EmptyCorrelationId`] if the id is empty.
    pub fn attach_correlated<T: Send + Sync + 'static>(
        &self,
        correlation_id: impl Into<Arc<str>>,
        handler: Arc<dyn Handler<T>>,
    ) -> Result<HandlerGuard, BusError> {
        let subscription = self.subscribe_correlated::<T>(correlation_id)?;
        Ok(HandlerGuard::spawn(subscription, handler))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::events::Envelope;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Ping(u32);

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<Ping>>,
    }

    #[async_trait]
    impl Handler<Ping> for Collector {
        async fn on_event(&self, envelope: &Envelope<Ping>) {
            self.seen.lock().unwrap().push(envelope.value().clone());
        }
        fn name(&self) -> &'static str {
            "collector"
        }
    }

    /// Panics on even payloads, records odd ones.
    #[derive(Default)]
    struct Picky {
        seen: Mutex<Vec<Ping>>,
    }

    #[async_trait]
    impl Handler<Ping> for Picky {
        async fn on_event(&self, envelope: &Envelope<Ping>) {
            if envelope.value().0 % 2 == 0 {
                panic!("even payload");
            }
            self.seen.lock().unwrap().push(envelope.value().clone());
        }
        fn name(&self) -> &'static str {
            "picky"
        }
    }

    async fn wait_for_len(seen: &Mutex<Vec<Ping>>, len: usize) {
        timeout(Duration::from_secs(5), async {
            while seen.lock().unwrap().len() < len {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("handler did not receive the expected envelopes in time");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_attached_handler_receives_in_order() {
        let bus = EventBus::new();
        let collector = Arc::new(Collector::default());
        let guard = bus.attach::<Ping>(collector.clone());

        for n in 0..5 {
            bus.publish(Envelope::generate(Ping(n)));
        }

        wait_for_len(&collector.seen, 5).await;
        assert_eq!(
            *collector.seen.lock().unwrap(),
            vec![Ping(0), Ping(1), Ping(2), Ping(3), Ping(4)]
        );
        guard.shutdown().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_handler_panic_is_isolated() {
        let bus = EventBus::new();
        let picky = Arc::new(Picky::default());
        let collector = Arc::new(Collector::default());
        let picky_guard = bus.attach::<Ping>(picky.clone());
        let collector_guard = bus.attach::<Ping>(collector.clone());

        bus.publish(Envelope::generate(Ping(0)));
        bus.publish(Envelope::generate(Ping(1)));
        bus.publish(Envelope::generate(Ping(2)));
        bus.publish(Envelope::generate(Ping(3)));

        // The panicking handler keeps running and the other handler sees
        // every envelope.
        wait_for_len(&collector.seen, 4).await;
        wait_for_len(&picky.seen, 2).await;
        assert_eq!(*picky.seen.lock().unwrap(), vec![Ping(1), Ping(3)]);
        assert_eq!(
            *collector.seen.lock().unwrap(),
            vec![Ping(0), Ping(1), Ping(2), Ping(3)]
        );

        picky_guard.shutdown().await;
        collector_guard.shutdown().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_shutdown_deregisters_subscription() {
        let bus = EventBus::new();
        let collector = Arc::new(Collector::default());
        let guard = bus.attach::<Ping>(collector.clone());
        assert_eq!(bus.subscription_count(), 1);

        guard.shutdown().await;
        assert_eq!(bus.subscription_count(), 0);

        bus.publish(Envelope::generate(Ping(1)));
        sleep(Duration::from_millis(20)).await;
        assert!(collector.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_attach_correlated_filters_and_validates() {
        let bus = EventBus::new();
        let collector = Arc::new(Collector::default());

        let err = bus
            .attach_correlated::<Ping>("", collector.clone())
            .unwrap_err();
        assert_eq!(err, BusError::EmptyCorrelationId);

        let guard = bus
            .attach_correlated::<Ping>("wanted", collector.clone())
            .unwrap();
        bus.publish(Envelope::new("other", Ping(1)).unwrap());
        bus.publish(Envelope::new("wanted", Ping(2)).unwrap());

        wait_for_len(&collector.seen, 1).await;
        assert_eq!(*collector.seen.lock().unwrap(), vec![Ping(2)]);
        guard.shutdown().await;
    }
}
