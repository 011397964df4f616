use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: chatty in dev builds, quiet in release.
fn default_directive() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "info" }
}

/// Install the global stderr subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}
