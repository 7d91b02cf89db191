use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CALBRIDGE_LOG";

/// Install the stderr subscriber. stdout is reserved for the JSON result.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
