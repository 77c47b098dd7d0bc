use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "TOOLDEX_LOG";

/// Install the global `tracing` subscriber, writing to stderr.
///
/// The filter comes from `TOOLDEX_LOG` and falls back to `info`. Calling
/// this more than once (or after another subscriber was installed) is a
/// no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
