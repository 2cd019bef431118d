//! Tracing subscriber setup shared by the binaries
//!
//! Log lines go to stderr so they interleave cleanly with the progress output on
//! stdout.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

fn filter_directives(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=warn,reqwest=warn"
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global fmt subscriber, writing to stderr
///
/// `RUST_LOG` wins over `verbose`. Calling this more than once is a no-op, and a
/// subscriber installed elsewhere is left in place.
pub fn init(verbose: bool) {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
