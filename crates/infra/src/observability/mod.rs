//! Logging and tracing setup
//!
//! One global `tracing` subscriber per process. `RUST_LOG` wins over the
//! configured level; output goes to stderr so command output on stdout stays
//! machine-readable.

use crmchat_domain::{LogFormat, LoggingConfig};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Build the filter: `RUST_LOG` if set and valid, else `config.level`, else
/// `info`
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// Safe to call more than once (e.g. from tests); only the first call has an
/// effect. Returns whether this process ended up with our subscriber, which
/// is `false` when another one was installed first.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        use tracing_subscriber::fmt;

        let filter = env_filter(config);
        let result = match config.format {
            LogFormat::Json => fmt::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .try_init(),
            LogFormat::Pretty => fmt::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };
        result.is_ok()
    })
}
