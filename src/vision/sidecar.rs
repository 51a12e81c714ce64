// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model sidecar client for segmentation and recognition
//!
//! The sidecar hosts the model runtime. Loading a model returns an opaque
//! handle id; segmentation and recognition calls pass the handle back.
//! Recognition opens a session that carries the page image once, then
//! issues one line per request as the prediction stream is polled.
//!
//! Handles and sessions are released on the sidecar when their last owner
//! drops them. Releases run as background tasks counted by
//! [`PendingReleases`], so a binary can wait for them before exiting.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt};
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::backend::{
    BackendError, ModelLoader, PredictionStream, RecognitionModel, SegmentationModel,
};
use super::layout::{LayoutResult, LineDescriptor, LinePrediction};
use crate::config::{BackendConfig, ModelKind};

const UNLOAD_ROUTE: &str = "/v1/models/unload";
const SESSION_CLOSE_ROUTE: &str = "/v1/recognize/session/close";

// --- wire structs ---

#[derive(Serialize)]
struct LoadRequest<'a> {
    kind: ModelKind,
    path: &'a str,
}

#[derive(Deserialize)]
struct LoadResponse {
    handle: String,
}

#[derive(Serialize)]
struct SegmentRequest<'a> {
    handle: &'a str,
    image: &'a str,
}

#[derive(Serialize)]
struct OpenSessionRequest<'a> {
    handle: &'a str,
    image: &'a str,
}

#[derive(Deserialize)]
struct OpenSessionResponse {
    session: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    session: &'a str,
    line: &'a LineDescriptor,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    text: String,
}

#[derive(Serialize)]
struct ReleaseRequest<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Count of release requests still in flight
#[derive(Clone, Default)]
pub struct PendingReleases {
    inner: Arc<ReleaseState>,
}

#[derive(Default)]
struct ReleaseState {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingReleases {
    fn start(&self) {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Wait until no release is in flight, up to `timeout`
    ///
    /// Returns `false` if releases were still pending at the deadline.
    pub async fn settle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let idle = self.inner.idle.notified();
                if self.pending() == 0 {
                    return;
                }
                idle.await;
            }
        })
        .await
        .is_ok()
    }
}

/// HTTP transport shared by the loader and the handles it creates
#[derive(Clone)]
struct SidecarTransport {
    client: Client,
    endpoint: String,
    releases: PendingReleases,
}

impl SidecarTransport {
    async fn send<B>(&self, route: &str, body: &B) -> Result<reqwest::Response, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.endpoint, route);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("POST {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    async fn post<B, R>(&self, route: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(route, body)
            .await?
            .json::<R>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("{}: {}", route, e)))
    }
}

/// Pull `error` out of a JSON error body, or fall back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no error message".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Encode an image as base64 PNG for transport
fn encode_for_transport(image: &DynamicImage) -> Result<String, BackendError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BackendError::Image(e.to_string()))?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

/// Sidecar-side id released through `release_route` on drop
struct RemoteId {
    transport: SidecarTransport,
    id: String,
    release_route: &'static str,
}

impl RemoteId {
    fn as_str(&self) -> &str {
        &self.id
    }
}

impl Drop for RemoteId {
    fn drop(&mut self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No runtime to release sidecar id {}", self.id);
                return;
            }
        };

        let transport = self.transport.clone();
        let id = std::mem::take(&mut self.id);
        let route = self.release_route;
        transport.releases.start();
        runtime.spawn(async move {
            match transport.send(route, &ReleaseRequest { id: &id }).await {
                Ok(_) => debug!("Released sidecar id {} via {}", id, route),
                Err(e) => warn!("Failed to release sidecar id {}: {}", id, e),
            }
            transport.releases.finish();
        });
    }
}

/// Model loader backed by the sidecar
pub struct SidecarBackend {
    transport: SidecarTransport,
}

impl SidecarBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Model sidecar configured: endpoint={}", endpoint);

        Ok(Self {
            transport: SidecarTransport {
                client,
                endpoint,
                releases: PendingReleases::default(),
            },
        })
    }

    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        Self::new(&config.endpoint, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.transport.endpoint
    }

    /// Releases started by handles and sessions from this backend
    pub fn pending_releases(&self) -> PendingReleases {
        self.transport.releases.clone()
    }

    /// Check if the sidecar is up
    pub async fn health_check(&self) -> bool {
        match self
            .transport
            .client
            .get(format!("{}/health", self.transport.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Sidecar health check failed: {}", e);
                false
            }
        }
    }

    async fn load(&self, kind: ModelKind, path: &str) -> Result<RemoteId, BackendError> {
        debug!("Loading {} model {}", kind, path);
        let response: LoadResponse = self
            .transport
            .post("/v1/models/load", &LoadRequest { kind, path })
            .await?;
        if response.handle.is_empty() {
            return Err(BackendError::InvalidResponse(
                "empty model handle".to_string(),
            ));
        }
        Ok(RemoteId {
            transport: self.transport.clone(),
            id: response.handle,
            release_route: UNLOAD_ROUTE,
        })
    }
}

#[async_trait]
impl ModelLoader for SidecarBackend {
    async fn load_segmentation_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn SegmentationModel>, BackendError> {
        let handle = self.load(ModelKind::Segmentation, path).await?;
        Ok(Arc::new(SidecarSegmenter { handle }))
    }

    async fn load_recognition_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn RecognitionModel>, BackendError> {
        let handle = self.load(ModelKind::Recognition, path).await?;
        Ok(Arc::new(SidecarRecognizer { handle }))
    }
}

/// Segmentation handle living in the sidecar
pub struct SidecarSegmenter {
    handle: RemoteId,
}

#[async_trait]
impl SegmentationModel for SidecarSegmenter {
    async fn segment(&self, image: &DynamicImage) -> Result<LayoutResult, BackendError> {
        let encoded = encode_for_transport(image)?;
        self.handle
            .transport
            .post(
                "/v1/segment",
                &SegmentRequest {
                    handle: self.handle.as_str(),
                    image: &encoded,
                },
            )
            .await
    }
}

/// Recognition handle living in the sidecar
pub struct SidecarRecognizer {
    handle: RemoteId,
}

/// One page uploaded to a recognition handle
struct RecognitionSession {
    session: RemoteId,
}

impl SidecarRecognizer {
    async fn open_session(&self, image: &DynamicImage) -> Result<RecognitionSession, BackendError> {
        let encoded = encode_for_transport(image)?;
        let response: OpenSessionResponse = self
            .handle
            .transport
            .post(
                "/v1/recognize/session",
                &OpenSessionRequest {
                    handle: self.handle.as_str(),
                    image: &encoded,
                },
            )
            .await?;
        debug!("Opened recognition session {}", response.session);

        Ok(RecognitionSession {
            session: RemoteId {
                transport: self.handle.transport.clone(),
                id: response.session,
                release_route: SESSION_CLOSE_ROUTE,
            },
        })
    }
}

impl RecognitionSession {
    async fn recognize_line(
        &self,
        line_index: usize,
        line: &LineDescriptor,
    ) -> Result<LinePrediction, BackendError> {
        let response: RecognizeResponse = self
            .session
            .transport
            .post(
                "/v1/recognize",
                &RecognizeRequest {
                    session: self.session.as_str(),
                    line,
                },
            )
            .await?;
        Ok(LinePrediction::from_line(line_index, response.text, line))
    }
}

impl RecognitionModel for SidecarRecognizer {
    fn recognize<'a>(
        &'a self,
        image: &'a DynamicImage,
        layout: &'a LayoutResult,
    ) -> PredictionStream<'a> {
        if layout.lines.is_empty() {
            return stream::empty().boxed();
        }

        let lines = layout.lines.iter().enumerate();
        stream::once(self.open_session(image))
            .map(move |opened| match opened {
                Ok(session) => {
                    let session = Arc::new(session);
                    stream::iter(lines.clone())
                        .then(move |(idx, line)| {
                            let session = Arc::clone(&session);
                            async move { session.recognize_line(idx, line).await }
                        })
                        .boxed()
                }
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            })
            .flatten()
            .boxed()
    }
}
