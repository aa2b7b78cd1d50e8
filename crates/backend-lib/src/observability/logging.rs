//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured `log_level` applies.
//! JSON output is meant for production, pretty output for development.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, Settings};

/// Install the global subscriber.
///
/// Returns `false` if one was already installed (e.g. a second call, or a
/// test harness that set its own), which is not an error.
pub fn init(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(level = %settings.log_level, format = ?settings.log_format, "Logging initialized");
            true
        },
        Err(_) => false,
    }
}
