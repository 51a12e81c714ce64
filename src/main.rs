// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use ocr_overlay::{
    api::start_server,
    config::{AppConfig, CONFIG_PATH_ENV},
    version,
    vision::{CachingLoader, ModelLoader, SidecarBackend},
};
use std::{env, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting {}", version::get_version_string());

    let config_path = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Models: {} segmentation, {} recognition",
        config.models.list_segmentation_models().len(),
        config.models.list_recognition_models().len()
    );

    let backend = SidecarBackend::from_config(&config.backend)?;
    if !backend.health_check().await {
        warn!(
            "Model sidecar at {} is not reachable yet; requests will fail until it is",
            backend.endpoint()
        );
    }

    let releases = backend.pending_releases();
    let capacity = config.pipeline.model_cache_capacity;
    let (loader, cache) = if capacity > 0 {
        info!("Model handle cache enabled: {} entries", capacity);
        let cache = Arc::new(CachingLoader::new(backend, capacity));
        (cache.clone() as Arc<dyn ModelLoader>, Some(cache))
    } else {
        (Arc::new(backend) as Arc<dyn ModelLoader>, None)
    };

    let served = start_server(config, loader).await;

    if let Some(cache) = cache {
        let stats = cache.stats().await;
        info!(
            "Model cache: {} hits, {} misses, {} handles held",
            stats.hits, stats.misses, stats.entries
        );
    }

    if !releases.settle(Duration::from_secs(5)).await {
        warn!("{} sidecar releases still pending at exit", releases.pending());
    }
    served
}
