// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP service: router, shared state and server lifecycle

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::errors::ApiError;
use super::{handlers, ocr, page};
use crate::config::{AppConfig, ModelRegistry};
use crate::vision::{ModelLoader, OcrPipeline};

/// Room for the multipart envelope around the image part
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared, read-only request context
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: OcrPipeline,
    permits: Semaphore,
}

impl AppState {
    pub fn new(config: AppConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let pipeline = OcrPipeline::new(loader).with_baseline_width(config.pipeline.baseline_width);
        let permits = Semaphore::new(config.pipeline.max_concurrent_requests.max(1));
        Self {
            config,
            pipeline,
            permits,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.config.models
    }

    /// Wait for a pipeline slot
    pub async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>, ApiError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| ApiError::ServiceUnavailable("server is shutting down".to_string()))
    }
}

/// Request body cap: room for the image part plus the form envelope
fn multipart_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD)
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = multipart_body_limit(state.config.server.max_upload_bytes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(page::index_handler))
        .route("/annotate", post(page::annotate_handler))
        .route("/health", get(handlers::health_handler))
        .route("/v1/models", get(handlers::models_handler))
        .route("/v1/ocr", post(ocr::ocr_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, loader: Arc<dyn ModelLoader>) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server
        .listen_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", config.server.listen_addr(), e))?;

    let state = Arc::new(AppState::new(config, loader));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    info!("  GET  /           - Upload form");
    info!("  POST /annotate   - Annotated page (HTML)");
    info!("  GET  /v1/models  - Model listings");
    info!("  POST /v1/ocr     - Annotate an image (JSON)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
