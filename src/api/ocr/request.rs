// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR form parsing and validation
//!
//! The same multipart form feeds the JSON endpoint and the HTML page:
//! `image` (file), `segmentationModel`, `recognitionModel`, `drawBaselines`.

use axum_extra::extract::Multipart;
use image::ImageFormat;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::config::{ModelKind, ModelRegistry};
use crate::vision::validate_upload;

/// A submitted OCR form
#[derive(Debug, Clone, Default)]
pub struct OcrForm {
    pub image: Option<Vec<u8>>,
    pub file_name: Option<String>,
    /// Display name; the first listed model when unset
    pub segmentation_model: Option<String>,
    /// Display name; the first listed model when unset
    pub recognition_model: Option<String>,
    pub draw_baselines: bool,
}

impl OcrForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = OcrForm::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    form.file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.image = Some(bytes.to_vec());
                }
                "segmentationModel" | "segmentation_model" => {
                    form.segmentation_model = non_empty(field.text().await.map_err(malformed)?);
                }
                "recognitionModel" | "recognition_model" => {
                    form.recognition_model = non_empty(field.text().await.map_err(malformed)?);
                }
                "drawBaselines" | "draw_baselines" => {
                    form.draw_baselines = parse_flag(&field.text().await.map_err(malformed)?)?;
                }
                _ => debug!("Ignoring unknown form field '{}'", name),
            }
        }

        Ok(form)
    }

    /// The uploaded bytes, which must be present and non-empty
    pub fn validate(&self) -> Result<&[u8], ApiError> {
        match self.image.as_deref() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            Some(_) => Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "image is empty".to_string(),
            }),
            None => Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "image is required".to_string(),
            }),
        }
    }

    /// Check size, extension and signature without decoding
    pub fn check_upload(&self, max_bytes: usize) -> Result<ImageFormat, ApiError> {
        let bytes = self.validate()?;
        Ok(validate_upload(self.file_name.as_deref(), bytes, max_bytes)?)
    }
}

fn malformed(err: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidRequest(format!("malformed multipart body: {}", err))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Checkbox-style boolean: absent or unchecked is false
pub fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(ApiError::ValidationError {
            field: "drawBaselines".to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

/// Registry-resolved model choice for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub segmentation_model: String,
    pub segmentation_path: String,
    pub recognition_model: String,
    pub recognition_path: String,
}

impl ModelSelection {
    pub fn resolve(
        registry: &ModelRegistry,
        segmentation: Option<&str>,
        recognition: Option<&str>,
    ) -> Result<Self, ApiError> {
        let (segmentation_model, segmentation_path) =
            resolve_one(registry, ModelKind::Segmentation, segmentation)?;
        let (recognition_model, recognition_path) =
            resolve_one(registry, ModelKind::Recognition, recognition)?;

        Ok(Self {
            segmentation_model,
            segmentation_path,
            recognition_model,
            recognition_path,
        })
    }
}

fn resolve_one(
    registry: &ModelRegistry,
    kind: ModelKind,
    requested: Option<&str>,
) -> Result<(String, String), ApiError> {
    let name = match requested.or_else(|| registry.default_model(kind)) {
        Some(name) => name,
        None => {
            return Err(ApiError::ServiceUnavailable(format!(
                "no {} models are configured",
                kind
            )))
        }
    };
    let path = registry
        .resolve(name, kind)
        .map_err(|e| ApiError::unknown_model(e, registry))?;
    Ok((name.to_string(), path.to_string()))
}
