//! Tracing subscriber setup for hosts embedding the engine.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "learnx_lib=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call has an effect, and an
/// already-installed global subscriber is left in place.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = fmt().with_env_filter(filter).with_target(true).try_init();
    });
}
