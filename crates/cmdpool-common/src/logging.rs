use tracing_subscriber::{fmt, EnvFilter};

/// Name of the environment variable holding the log filter.
pub const LOG_ENV: &str = "CMDPOOL_LOG";

/// Initialize structured logging with environment filter.
/// Set CMDPOOL_LOG=debug (or trace, info, warn, error) for verbosity control.
/// Pool growth and submissions log at debug, per-buffer transitions at trace.
pub fn init_logging() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Like [`init_logging`] but safe to call more than once, for test binaries
/// where several tests race to install the subscriber.
pub fn try_init_logging() -> bool {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}
