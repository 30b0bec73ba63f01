use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber for the server. `RUST_LOG` overrides the
/// default `info` level.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_target(false)
        .init();
}

/// Client programs own stdout for their prompts, so diagnostics go to
/// stderr and stay quiet unless asked for.
pub fn init_client() {
    tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .init();
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
