// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page layout annotation
//!
//! This module provides:
//! - Layout types exchanged with the segmentation / recognition runtime
//! - The model sidecar client and an optional handle cache
//! - The per-request pipeline, renderer and listing builder
//!
//! Inference itself runs outside this process.

pub mod backend;
pub mod display;
pub mod image_utils;
pub mod layout;
pub mod model_cache;
pub mod pipeline;
pub mod render;
pub mod sidecar;

pub use backend::{BackendError, ModelLoader, PredictionStream, RecognitionModel, SegmentationModel};
pub use display::{build_entries, markdown_items, to_markdown, DisplayField, DisplayLine, EntryKind};
pub use image_utils::{decode_upload, detect_format, validate_upload, ImageError, ImageInfo};
pub use layout::{LayoutResult, LineDescriptor, LinePrediction, Point, RegionDescriptor, RegionMap, Tags};
pub use model_cache::{CachingLoader, ModelCacheStats};
pub use pipeline::{OcrPipeline, PipelineError, PipelineOutput};
pub use render::{annotate, draw_polygon, draw_polyline, RenderError};
pub use sidecar::{PendingReleases, SidecarBackend};
