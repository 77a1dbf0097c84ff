//! Tracing subscriber setup for binaries and examples.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the application's choice. [`init`] wires the conventional stack:
//! env-filtered fmt output plus span-trace capture for rich error reports.

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: `RUST_LOG`-driven filtering (default
/// `info`), compact fmt output, and an [`ErrorLayer`] so span traces attach
/// to errors.
///
/// Call once at startup; a second call panics like any double subscriber
/// registration would.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(ErrorLayer::default())
        .init();
}
