//! Tracing initialization for service entry points.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize environment and tracing for a service entry point.
///
/// Loads `.env` if present, then installs an env-filterable subscriber.
/// `RUST_LOG` controls verbosity; defaults to `info`.
pub fn init_tracing() {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reel_worker=info,reel_ml_client=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
