use std::env;
use std::path::Path;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use worker::config;
use worker::upstream_session::UpstreamError;
use worker::WorkerError;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path =
        env::var("WORKER_CONFIG").unwrap_or_else(|_| "/etc/rusty-proxy/worker.toml".to_owned());
    let cfg = match config::load_config_from_path(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, path = %config_path, "failed to load worker config");
            std::process::exit(1);
        }
    };

    info!("starting worker");
    match worker::run(cfg).await {
        Ok(()) => info!("worker exited cleanly"),
        Err(WorkerError::Upstream(UpstreamError::LoginFailed {
            root_cause,
            correct_version: Some(version),
        })) if root_cause == "LOGIN-0001" => {
            warn!(
                correct_client_version = %version,
                "league version mismatch reported by upstream; exiting for config rewrite and respawn"
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, "worker exited with error");
            std::process::exit(1);
        }
    }
}
