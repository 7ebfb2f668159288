//! Logging setup for the provider.
//!
//! All logs go to **stderr**; stdout belongs to the host's plugin protocol.
//! Filtering follows `RUST_LOG`, for example:
//!
//! ```bash
//! # Trace every semantic comparison
//! RUST_LOG=aap_provider::customtypes=trace
//!
//! # Log requests sent to the AAP server
//! RUST_LOG=aap_provider::client=debug
//! ```

use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default level used when `RUST_LOG` is not set.
pub const DEFAULT_LEVEL: &str = "info";

fn subscriber(default_level: &str) -> impl Subscriber + Send + Sync + 'static {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Install the global subscriber at the [`DEFAULT_LEVEL`].
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    subscriber(DEFAULT_LEVEL).init();
}

/// Like [`init_logging`], with a different level for when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to install the global subscriber.
///
/// Returns `false` instead of panicking when one is already set, which makes
/// it safe to call from tests.
pub fn try_init_logging() -> bool {
    subscriber(DEFAULT_LEVEL).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LEVEL).is_ok());
        assert!(EnvFilter::try_new("aap_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,aap_provider::customtypes=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
