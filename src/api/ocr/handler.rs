// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::request::{ModelSelection, OcrForm};
use super::response::OcrResponse;
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::http_server::AppState;
use crate::vision::decode_upload;

/// POST /v1/ocr - Annotate a page image
///
/// # Request (multipart/form-data)
/// - `image`: PNG or JPEG file (required)
/// - `segmentationModel`: display name, defaults to the first listed
/// - `recognitionModel`: display name, defaults to the first listed
/// - `drawBaselines`: boolean, defaults to false
///
/// # Errors
/// - 400 Bad Request: missing, empty, oversized or undecodable image
/// - 404 Not Found: unknown model name
/// - 415 Unsupported Media Type: not a PNG or JPEG
/// - 502 Bad Gateway: model load, segmentation or recognition failed
pub async fn ocr_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiErrorResponse> {
    let request_id = uuid::Uuid::new_v4().to_string();

    let form = OcrForm::from_multipart(multipart)
        .await
        .map_err(|e| ApiErrorResponse::new(e, &request_id))?;

    run_ocr(&state, &form, &request_id)
        .await
        .map(Json)
        .map_err(|e| ApiErrorResponse::new(e, &request_id))
}

/// Validate, resolve, and run the pipeline for one submitted form
pub async fn run_ocr(
    state: &AppState,
    form: &OcrForm,
    request_id: &str,
) -> Result<OcrResponse, ApiError> {
    let max_bytes = state.config.server.max_upload_bytes;

    // 1. Reject bad uploads before any model is touched
    if let Err(e) = form.check_upload(max_bytes) {
        warn!(request_id = %request_id, "Upload rejected: {}", e);
        return Err(e);
    }

    // 2. Resolve model names
    let selection = ModelSelection::resolve(
        state.registry(),
        form.segmentation_model.as_deref(),
        form.recognition_model.as_deref(),
    )
    .map_err(|e| {
        warn!(request_id = %request_id, "Model selection rejected: {}", e);
        e
    })?;

    // 3. Decode
    let bytes = form.validate()?;
    let (image, info) = decode_upload(form.file_name.as_deref(), bytes, max_bytes)?;
    debug!(
        request_id = %request_id,
        "Decoded image: {}x{}, {} bytes",
        info.width, info.height, info.size_bytes
    );

    // 4. Run the pipeline
    let _permit = state.acquire_slot().await?;
    info!(
        request_id = %request_id,
        segmentation = %selection.segmentation_model,
        recognition = %selection.recognition_model,
        "Processing OCR request"
    );

    let output = state
        .pipeline
        .run(
            &image,
            &selection.segmentation_path,
            &selection.recognition_path,
            form.draw_baselines,
        )
        .await
        .map_err(|e| {
            warn!(request_id = %request_id, "Pipeline failed at {}: {}", e.stage(), e);
            ApiError::from(e)
        })?;

    info!(
        request_id = %request_id,
        lines = output.line_count,
        regions = output.region_count,
        "OCR complete in {}ms",
        output.processing_time_ms
    );

    OcrResponse::build(request_id, &selection, form.draw_baselines, output)
}
