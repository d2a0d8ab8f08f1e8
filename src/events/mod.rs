//! Event data model.
//!
//! This module holds the value types that travel through the bus:
//! - [`Envelope`] — the public, typed envelope published by producers.
//! - `AnyEnvelope` (crate-private) — the type-erased wire form the bus
//!   fans out to subscription queues.

mod envelope;

pub use envelope::Envelope;

pub(crate) use envelope::AnyEnvelope;
