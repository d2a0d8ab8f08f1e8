//! # corrbus
//!
//! **corrbus** is an in-process publish/subscribe event bus for Rust.
//!
//! Producers publish typed, correlation-tagged [`Envelope`]s; consumers
//! subscribe to a stream filtered by payload type and, optionally, by a
//! correlation id tying a response to a prior request. It is a
//! single-process primitive, not a broker: no persistence, no networking,
//! no replay.
//!
//! ## Architecture
//! ```text
//!  Producer A ──┐                         ┌──► [queue] ─► Subscription<Order>
//!  Producer B ──┼─► EventBus::publish ────┼──► [queue] ─► Subscription<Order>
//!  Producer C ──┘    │                    └──► [queue] ─► Subscription<Invoice>
//!                    │  per-subscription filter:
//!                    │    payload TypeId == requested type
//!                    │    && (no correlation filter
//!                    │        || correlation id matches exactly)
//!                    ▼
//!          every matching live subscription gets its own copy
//!          (broadcast, not load-balanced; no history for late joiners)
//! ```
//!
//! ## Delivery rules
//! - **Non-blocking publish**: `publish` enqueues and returns; slow
//!   consumers buffer in their own queue (unbounded by default).
//! - **Per-subscription FIFO**: externally ordered publishes are observed
//!   in order by each subscription; no ordering across subscriptions.
//! - **Isolation**: canceling, stalling, or panicking in one consumer
//!   never affects the publisher or other consumers.
//!
//! ## Features
//! | Area             | Description                                               | Key types / traits              |
//! |------------------|-----------------------------------------------------------|---------------------------------|
//! | **Envelopes**    | Immutable correlation-tagged payloads, generated ids.     | [`Envelope`]                    |
//! | **Bus**          | Concurrent fan-out with type + correlation filtering.     | [`EventBus`]                    |
//! | **Pull streams** | Lazy, infinite, ordered per-consumer streams.             | [`Subscription`]                |
//! | **Push handlers**| Worker-driven callbacks with panic isolation.             | [`Handler`], [`HandlerGuard`]   |
//! | **Errors**       | Synchronous argument validation.                          | [`BusError`]                    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogHandler` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use corrbus::{Envelope, EventBus};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct PriceQuoted { symbol: &'static str, cents: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), corrbus::BusError> {
//!     let bus = EventBus::new();
//!
//!     // A consumer waiting for the answer to one specific request.
//!     let mut reply = bus.subscribe_correlated::<PriceQuoted>("req-42")?;
//!     // An audit consumer seeing every quote.
//!     let mut audit = bus.subscribe::<PriceQuoted>();
//!
//!     bus.publish(Envelope::new("req-41", PriceQuoted { symbol: "AAA", cents: 100 })?);
//!     bus.publish(Envelope::new("req-42", PriceQuoted { symbol: "BBB", cents: 250 })?);
//!
//!     let envelope = reply.recv().await.unwrap();
//!     assert_eq!(envelope.value().symbol, "BBB");
//!
//!     assert_eq!(audit.recv().await.unwrap().value().symbol, "AAA");
//!     assert_eq!(audit.recv().await.unwrap().value().symbol, "BBB");
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod events;
mod handlers;

// ---- Public re-exports ----

pub use bus::{EventBus, Subscription};
pub use error::BusError;
pub use events::Envelope;
pub use handlers::{Handler, HandlerGuard};

// Optional: expose a simple built-in println handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogHandler;
