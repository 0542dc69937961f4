mod bridge;
mod creds;
mod pipeline;
mod proxy;
mod service;
mod store;

use shotclock_common::config::Config;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shotclock.toml"));

    let config = match Config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        data_dir = %config.storage.data_dir.display(),
        display_limit = config.capture.display_limit,
        thumbnail_width = config.capture.thumbnail_width,
        "starting shotclock control process"
    );

    let store = store::RetentionStore::new(config.screenshots_dir());
    let pipeline = pipeline::ScreenshotPipeline::new(store, &config.capture);
    let credential_store = creds::CredentialStore::new(config.credentials_path());
    let proxy = match proxy::ErpProxy::new(&config.erp) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let service = service::ControlService::new(pipeline, credential_store, proxy);
    if let Err(e) = bridge::serve(config.socket_path(), service).await {
        error!(error = %e, "bridge server exited");
        std::process::exit(1);
    }
}
