//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! the host's job. `init_logging` is the one-liner for binaries and
//! integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Safe to call more than
/// once; subsequent calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
