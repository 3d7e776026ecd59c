//! Diagnostic logging setup.
//!
//! Records go to stderr so stdout stays reserved for command output that an
//! agent driver may parse. The filter is read from `SCAFFOLD_LOG`, then
//! `RUST_LOG`, and defaults to `warn`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "SCAFFOLD_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Resolve the log filter from the environment.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Calling it twice is an error.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging();
        assert!(init_logging().is_err());
    }
}
