use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber. The filter comes from `SOINS_LOG`,
/// then `RUST_LOG`, then defaults to `info`.
pub fn init() {
    let filter = std::env::var("SOINS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt::layer().with_target(true))
        .init();
}
