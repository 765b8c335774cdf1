//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so stdout stays reserved for scan output and JSON.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` wins over `verbose`; later calls are ignored.
pub fn init_logging(verbose: bool, json: bool) {
    INIT.call_once(|| {
        let default_level = if verbose { "debug" } else { "warn" };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let result = if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()
        };
        if result.is_ok() {
            tracing::debug!(json, "Logging initialized");
        }
    });
}
