use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use librarium::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = Config::from_env();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "librarium",
        "librarium starting: RUST_LOG='{}', http_port={}, db='{}', secure_cookies={}, rating_min={}, rate_owner_only={}",
        rust_log, cfg.http_port, cfg.db_path, cfg.secure_cookies, cfg.rating_min, cfg.rate_owner_only
    );

    librarium::server::run(cfg).await
}
