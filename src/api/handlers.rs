// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::http_server::AppState;
use crate::config::ModelKind;
use crate::version;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub features: Vec<String>,
}

/// Both model listings in configured order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub segmentation: Vec<String>,
    pub recognition: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_segmentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_recognition: Option<String>,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
    })
}

/// GET /v1/models
pub async fn models_handler(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let registry = state.registry();
    Json(ModelsResponse {
        segmentation: registry.list_segmentation_models(),
        recognition: registry.list_recognition_models(),
        default_segmentation: registry
            .default_model(ModelKind::Segmentation)
            .map(str::to_string),
        default_recognition: registry
            .default_model(ModelKind::Recognition)
            .map(str::to_string),
    })
}
