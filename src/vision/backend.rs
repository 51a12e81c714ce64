// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Boundaries to the external segmentation / recognition runtime
//!
//! The pipeline only sees these traits. Handles are opaque and used through
//! `&self`, so a shared handle can never be observed mid-mutation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use image::DynamicImage;
use thiserror::Error;

use super::layout::{LayoutResult, LinePrediction};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model runtime unreachable: {0}")]
    Unavailable(String),

    #[error("model runtime rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from model runtime: {0}")]
    InvalidResponse(String),

    #[error("failed to encode image: {0}")]
    Image(String),

    #[error("{0}")]
    Other(String),
}

/// Lazy, single-pass sequence of per-line predictions
pub type PredictionStream<'a> = BoxStream<'a, Result<LinePrediction, BackendError>>;

/// Turns an artifact path into a ready-to-use model handle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_segmentation_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn SegmentationModel>, BackendError>;

    async fn load_recognition_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn RecognitionModel>, BackendError>;
}

/// Loaded segmentation model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentationModel: Send + Sync {
    async fn segment(&self, image: &DynamicImage) -> Result<LayoutResult, BackendError>;
}

/// Loaded recognition model
pub trait RecognitionModel: Send + Sync {
    /// One prediction per layout line, in line order
    ///
    /// Nothing is recognized until the stream is polled.
    fn recognize<'a>(
        &'a self,
        image: &'a DynamicImage,
        layout: &'a LayoutResult,
    ) -> PredictionStream<'a>;
}
