//! Diagnostic logging to stderr

use tracing::Level;
use tracing_subscriber::EnvFilter;

use super::config::LauncherConfig;

/// Variable holding a full `EnvFilter` directive, overriding the flags.
pub const LOG_ENV: &str = "PYMANAGER_LOG";

pub fn default_level(config: &LauncherConfig) -> Level {
    if config.debug {
        Level::DEBUG
    } else if config.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(config: &LauncherConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level(config).as_str().to_ascii_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
