use tracing_subscriber::EnvFilter;

/// `--verbose` wins, then `RUST_LOG`, then the configured level
pub fn env_filter(config_level: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber on stderr, leaving stdout for XML and JSON output
pub fn init(config_level: &str, verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config_level, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
