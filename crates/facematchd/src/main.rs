use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use facematch_core::{EncodingStore, EuclideanMatcher};
use tracing_subscriber::EnvFilter;

mod config;
mod http;
mod payload;
mod service;

use config::Config;
use service::FaceService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        bind = %config.bind,
        backend = ?config.backend,
        db = %config.db_path.display(),
        threshold = config.threshold,
        "facematchd starting"
    );

    ensure!(
        config.threshold.is_finite() && config.threshold > 0.0,
        "FACEMATCH_THRESHOLD must be positive, got {}",
        config.threshold
    );
    let matcher = EuclideanMatcher::new(config.distance_scale)?;

    let backend = facematch_core::open_backend(config.backend, &config.db_path)
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;
    let store = Arc::new(EncodingStore::open(backend, config.store_config()).await?);

    // No image model ships with the daemon; clients submit encodings
    // computed on their side.
    tracing::info!("no image encoder configured; accepting precomputed encodings only");
    let mut service = FaceService::new(store, matcher, config.threshold);
    if let Some(dir) = config.image_dir.clone() {
        tracing::info!(dir = %dir.display(), "saving registration images");
        service = service.with_image_dir(dir);
    }
    let service = Arc::new(service);

    http::serve(&config.bind, service, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("facematchd shutting down");
    })
    .await
}
