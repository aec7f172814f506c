//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "shell_socket=info";

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `shell_socket=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

/// Initialize logging with an explicit filter directive.
///
/// A bare level such as `debug` is scoped to this crate; anything else
/// is handed to [`EnvFilter`] verbatim. An unparsable directive falls
/// back to the default filter.
pub fn init_with_level(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let directive = filter_directive(level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| default_filter());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        lvl @ ("error" | "warn" | "info" | "debug" | "trace") => {
            format!("shell_socket={},tower_http={}", lvl, lvl)
        }
        _ => level.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        // First call may or may not succeed depending on test order
        let _ = try_init();
        let _ = try_init();
    }

    #[test]
    fn test_bare_level_is_scoped() {
        assert_eq!(
            filter_directive("DEBUG"),
            "shell_socket=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_full_directive_passes_through() {
        assert_eq!(filter_directive("axum=trace"), "axum=trace");
    }

    #[test]
    fn test_logging_works() {
        let _ = init_with_level("debug");

        tracing::info!("test info message");
        tracing::debug!("test debug message");
        tracing::warn!("test warn message");
    }
}
