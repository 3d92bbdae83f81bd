//! Tracing bootstrap for embedders and tests.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; only the first call installs anything.
/// Returns whether this call installed the subscriber.
pub fn init_tracing() -> bool {
    init_tracing_with("info")
}

/// Like [`init_tracing`], with an explicit fallback filter directive.
pub fn init_tracing_with(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
