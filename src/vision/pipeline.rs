// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! One request end to end: load, segment, recognize, list, render
//!
//! Any stage failure ends the run. Nothing is retried and no partial image
//! or listing is returned.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backend::{BackendError, ModelLoader};
use super::display::{build_entries, DisplayLine};
use super::render::{annotate, DEFAULT_BASELINE_WIDTH};
use crate::config::ModelKind;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load {kind} model '{path}': {source}")]
    ModelLoad {
        kind: ModelKind,
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("segmentation failed: {0}")]
    Segmentation(#[source] BackendError),

    #[error("recognition failed{}: {source}", line_suffix(*.line))]
    Recognition {
        line: Option<usize>,
        #[source]
        source: BackendError,
    },

    #[error("recognition produced {actual} predictions for {expected} lines")]
    PredictionMismatch { expected: usize, actual: usize },

    #[error("recognition out of order: prediction {position} is for line {line_index}")]
    PredictionOrder { position: usize, line_index: usize },

    #[error("rendering failed: {0}")]
    Render(String),
}

fn line_suffix(line: Option<usize>) -> String {
    line.map(|idx| format!(" on line {}", idx + 1))
        .unwrap_or_default()
}

impl PipelineError {
    /// Stage that failed, for user-facing messages
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::ModelLoad { .. } => "model load",
            PipelineError::Segmentation(_) => "segmentation",
            PipelineError::Recognition { .. }
            | PipelineError::PredictionMismatch { .. }
            | PipelineError::PredictionOrder { .. } => "recognition",
            PipelineError::Render(_) => "render",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub annotated: RgbaImage,
    pub entries: Vec<DisplayLine>,
    pub line_count: usize,
    pub region_count: usize,
    pub processing_time_ms: u64,
}

pub struct OcrPipeline {
    loader: Arc<dyn ModelLoader>,
    baseline_width: u32,
}

impl OcrPipeline {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            baseline_width: DEFAULT_BASELINE_WIDTH,
        }
    }

    pub fn with_baseline_width(mut self, width: u32) -> Self {
        self.baseline_width = width.max(1);
        self
    }

    pub async fn run(
        &self,
        image: &DynamicImage,
        seg_path: &str,
        rec_path: &str,
        draw_baselines: bool,
    ) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        info!(
            "Pipeline start: segmentation={}, recognition={}, draw_baselines={}",
            seg_path, rec_path, draw_baselines
        );

        let segmenter = self
            .loader
            .load_segmentation_model(seg_path)
            .await
            .map_err(|source| load_error(ModelKind::Segmentation, seg_path, source))?;
        let recognizer = self
            .loader
            .load_recognition_model(rec_path)
            .await
            .map_err(|source| load_error(ModelKind::Recognition, rec_path, source))?;

        let layout = segmenter.segment(image).await.map_err(|e| {
            warn!("Segmentation failed: {}", e);
            PipelineError::Segmentation(e)
        })?;
        let expected = layout.lines.len();
        debug!(
            "Segmented {} lines, {} regions",
            expected,
            layout.regions.region_count()
        );

        let mut predictions = Vec::with_capacity(expected);
        {
            let mut stream = recognizer.recognize(image, &layout);
            while let Some(item) = stream.next().await {
                let position = predictions.len();
                let prediction = item.map_err(|source| {
                    warn!("Recognition failed on line {}: {}", position + 1, source);
                    PipelineError::Recognition {
                        line: Some(position),
                        source,
                    }
                })?;
                if position >= expected {
                    return Err(PipelineError::PredictionMismatch {
                        expected,
                        actual: position + 1,
                    });
                }
                if prediction.line_index != position {
                    return Err(PipelineError::PredictionOrder {
                        position,
                        line_index: prediction.line_index,
                    });
                }
                predictions.push(prediction);
            }
        }
        if predictions.len() != expected {
            return Err(PipelineError::PredictionMismatch {
                expected,
                actual: predictions.len(),
            });
        }

        let entries = build_entries(&predictions, &layout.regions, draw_baselines);
        let region_count = layout.regions.region_count();

        // rasterizing is CPU-bound
        let page = image.clone();
        let regions = layout.regions;
        let baseline_width = self.baseline_width;
        let annotated = tokio::task::spawn_blocking(move || {
            annotate(&page, &predictions, &regions, draw_baselines, baseline_width)
        })
        .await
        .map_err(|e| PipelineError::Render(format!("render task failed: {}", e)))?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Pipeline done: {} lines, {} regions in {}ms",
            expected, region_count, processing_time_ms
        );

        Ok(PipelineOutput {
            annotated,
            entries,
            line_count: expected,
            region_count,
            processing_time_ms,
        })
    }
}

fn load_error(kind: ModelKind, path: &str, source: BackendError) -> PipelineError {
    warn!("Failed to load {} model {}: {}", kind, path, source);
    PipelineError::ModelLoad {
        kind,
        path: path.to_string(),
        source,
    }
}
