//! Logging setup for the plugin process.
//!
//! All log output goes to **stderr**; stdout carries only the handshake line
//! the plugin host parses. Filtering follows `RUST_LOG`
//! (e.g. `info`, `redmine_provider=debug`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn install(default_level: &str, must_succeed: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true));

    if must_succeed {
        subscriber.init();
        true
    } else {
        subscriber.try_init().is_ok()
    }
}

/// Initialize the default logging subscriber at `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    install("info", true);
}

/// Initialize logging with a custom default level, used when `RUST_LOG`
/// is not set.
pub fn init_logging_with_default(default_level: &str) {
    install(default_level, true);
}

/// Try to initialize logging, returning false if a subscriber is already
/// installed. Useful in tests where several cases race to set it up.
pub fn try_init_logging() -> bool {
    install("info", false)
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so
    // initialization itself is not exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("debug").is_ok());
        assert!(EnvFilter::try_new("redmine_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,redmine_provider=debug").is_ok());
    }
}
