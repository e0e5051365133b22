use std::env;
use std::path::Path;

use dispatcher::config;
use dispatcher::Dispatcher;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path = env::var("DISPATCHER_CONFIG")
        .unwrap_or_else(|_| "/etc/rusty-proxy/dispatcher.toml".to_owned());
    let cfg = match config::load_config_from_path(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, path = %config_path, "failed to load dispatcher config");
            std::process::exit(1);
        }
    };

    info!("starting dispatcher");
    if let Err(e) = Dispatcher::new(cfg).run().await {
        error!(error = %e, "dispatcher exited with error");
        std::process::exit(1);
    }
}
