// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use super::request::ModelSelection;
use crate::api::errors::ApiError;
use crate::vision::image_utils::encode_png_base64;
use crate::vision::{to_markdown, DisplayLine, PipelineOutput};

/// Response from one annotation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub request_id: String,
    pub segmentation_model: String,
    pub recognition_model: String,
    pub draw_baselines: bool,
    pub image_width: u32,
    pub image_height: u32,
    /// Base64-encoded PNG
    pub annotated_image: String,
    /// Lines first, then regions
    pub entries: Vec<DisplayLine>,
    pub markdown: String,
    pub line_count: usize,
    pub region_count: usize,
    pub processing_time_ms: u64,
}

impl OcrResponse {
    pub fn build(
        request_id: &str,
        selection: &ModelSelection,
        draw_baselines: bool,
        output: PipelineOutput,
    ) -> Result<Self, ApiError> {
        let annotated_image = encode_png_base64(&output.annotated)?;
        let markdown = to_markdown(&output.entries);

        Ok(Self {
            request_id: request_id.to_string(),
            segmentation_model: selection.segmentation_model.clone(),
            recognition_model: selection.recognition_model.clone(),
            draw_baselines,
            image_width: output.annotated.width(),
            image_height: output.annotated.height(),
            annotated_image,
            entries: output.entries,
            markdown,
            line_count: output.line_count,
            region_count: output.region_count,
            processing_time_ms: output.processing_time_ms,
        })
    }
}
