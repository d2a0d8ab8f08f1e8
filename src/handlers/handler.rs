//! # Push-style consumption contract.
//!
//! `Handler` is the extension point for consumers that want envelopes
//! delivered to them instead of pulling from a [`Subscription`](crate::Subscription).
//! Each attached handler is driven by a dedicated worker task fed by its
//! own subscription queue, so a slow or panicking handler never blocks
//! the publisher or other consumers.
//!
//! ## Example (skeleton)
//! ```
//! use async_trait::async_trait;
//! use corrbus::{Envelope, Handler};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Handler<String> for Audit {
//!     async fn on_event(&self, _envelope: &Envelope<String>) {
//!         // write audit record...
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Envelope;

/// Contract for push-style envelope consumers.
///
/// Called from a handler-dedicated worker task. Implementations may be
/// slow (I/O, batching) without affecting anyone else, but should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Handler<T>: Send + Sync + 'static {
    /// Handles a single envelope.
    async fn on_event(&self, envelope: &Envelope<T>);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
