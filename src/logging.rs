//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

static INIT: Once = Once::new();

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
///
/// `RUST_LOG` takes precedence over `log.level`. Later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);
        if config.json {
            registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
        } else {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init();
        }
    });
}
