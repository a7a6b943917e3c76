//! Structured logging init, grounded in the `tracing-subscriber` setup
//! pattern used across the retrieval pack (e.g. Vanopticon-Heimdall's
//! `observability/logging.rs`): an `EnvFilter` sourced from `RUST_LOG`
//! with a config-file fallback, feeding either a plain or JSON formatter.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global `tracing` subscriber. Safe to call once per
/// process; a second call is a no-op (`try_init` swallows the error).
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.format == "json" {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init();
    } else {
        let text_layer = tracing_subscriber::fmt::layer().with_target(true).with_level(true);
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(text_layer)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        init_logging(&LoggingConfig::default());
        init_logging(&LoggingConfig::default());
    }
}
