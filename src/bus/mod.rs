//! The bus engine and its consumer-side handle.
//!
//! ## Contents
//! - [`EventBus`] — publish/subscribe engine with filtering fan-out.
//! - [`Subscription`] — per-consumer queue and stream.
//!
//! ## Quick reference
//! - **Publishers**: any task holding a clone of the bus.
//! - **Consumers**: `Subscription::recv` / `Stream`, or a push-style
//!   [`Handler`](crate::Handler) attached via
//!   [`EventBus::attach`](crate::EventBus::attach).

mod core;
mod subscription;

pub use self::core::EventBus;
pub use subscription::Subscription;
