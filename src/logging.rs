//! Tracing setup.
//!
//! Diagnostics go to stderr via `RUST_LOG`. They are never part of a
//! transcript; transcripts only carry step output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber.
///
/// Reads `RUST_LOG`; falls back to `default_directive` when unset.
///
/// ```bash
/// RUST_LOG=relayprobe=debug,tower_http=debug relayprobe serve
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
