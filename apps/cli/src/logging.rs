use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Initialize the logging system. Logs go to stderr so they do not mix
/// with the player output; `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("Invalid log level")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Setting default subscriber failed: {e}"))
}
