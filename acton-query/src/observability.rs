//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install a global tracing subscriber from the logging settings
///
/// `RUST_LOG` takes precedence over `logging.level`. An invalid directive
/// falls back to `info`. Installing twice is a no-op, so tests and host
/// applications that already own a subscriber can call this freely.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::info!(
            level = %config.logging.level,
            json = config.logging.json,
            "Tracing initialized"
        );
    } else {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}
