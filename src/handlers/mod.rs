//! Push-style consumption: the [`Handler`] trait and its worker plumbing.
//!
//! ## Contents
//! - [`Handler`] — async per-envelope callback contract.
//! - [`HandlerGuard`] — owner handle for an attached handler's worker.
//! - `LogHandler` — println demo handler (feature = `"logging"`).

mod handler;
mod worker;

pub use handler::Handler;
pub use worker::HandlerGuard;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogHandler;
