//! Tracing subscriber installation

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` overrides `default_filter`. Returns `false` when a global
/// subscriber is already set, so calling this twice is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
