//! Logging setup for binaries and examples embedding the SDK.
//!
//! The SDK itself only emits `tracing` events; hosts that already have a
//! subscriber installed should not call this.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize human-readable text logging filtered by `RUST_LOG`.
pub fn initialize_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
