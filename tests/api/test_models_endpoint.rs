// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /v1/models and GET /health

use axum::http::StatusCode;
use ocr_overlay::config::{AppConfig, ModelDescriptor, ModelRegistry};
use tower::ServiceExt;

use super::support::{app, app_with, body_json, get_request};
use crate::vision_support::{scenario_layout, FakeBackend};

#[tokio::test]
async fn test_models_listing_in_configured_order() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend)
        .oneshot(get_request("/v1/models"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["segmentation"],
        serde_json::json!(["1col_442_sam_v1.mlmodel", "ubma_sam_v4.mlmodel"])
    );
    assert_eq!(
        json["recognition"],
        serde_json::json!(["sinai_sam_rec_v4.mlmodel", "sinai_sam_rec_v2.mlmodel"])
    );
    assert_eq!(json["defaultSegmentation"], "1col_442_sam_v1.mlmodel");
}

#[tokio::test]
async fn test_models_listing_from_config() {
    let backend = FakeBackend::new(scenario_layout());
    let mut config = AppConfig::default();
    config.models = ModelRegistry::new(
        vec![ModelDescriptor::new("blla", "models/blla.mlmodel")],
        vec![
            ModelDescriptor::new("z-last", "models/z.mlmodel"),
            ModelDescriptor::new("a-first", "models/a.mlmodel"),
        ],
    )
    .unwrap();

    let response = app_with(&backend, config)
        .oneshot(get_request("/v1/models"))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["segmentation"], serde_json::json!(["blla"]));
    assert_eq!(json["recognition"], serde_json::json!(["z-last", "a-first"]));
    assert_eq!(json["defaultRecognition"], "z-last");
}

#[tokio::test]
async fn test_health() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend).oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    let features = json["features"].as_array().unwrap();
    assert!(features.contains(&serde_json::json!("baselines")));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend)
        .oneshot(get_request("/v1/unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
