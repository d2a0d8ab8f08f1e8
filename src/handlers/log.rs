//! # LogHandler — simple envelope printer
//!
//! A minimal handler that prints incoming envelopes to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [envelope] correlation_id=5a9c... value=OrderPlaced(7)
//! ```

use std::fmt::Debug;

use async_trait::async_trait;

use crate::events::Envelope;
use crate::handlers::Handler;

/// Envelope printer handler.
#[derive(Default)]
pub struct LogHandler;

impl LogHandler {
    /// Constructs a new [`LogHandler`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Debug + Send + Sync + 'static> Handler<T> for LogHandler {
    async fn on_event(&self, envelope: &Envelope<T>) {
        println!(
            "[envelope] correlation_id={} value={:?}",
            envelope.correlation_id(),
            envelope.value()
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
