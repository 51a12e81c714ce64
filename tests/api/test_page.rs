// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Browser form and annotated result page

use axum::http::StatusCode;
use tower::ServiceExt;

use super::support::{app, body_text, get_request, multipart_request, Part};
use crate::vision_support::{png_bytes, scenario_layout, FakeBackend};

#[tokio::test]
async fn test_index_form() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend).oneshot(get_request("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(html.contains("<option value=\"ubma_sam_v4.mlmodel\">ubma_sam_v4.mlmodel</option>"));
    assert!(html.contains("<option value=\"sinai_sam_rec_v2.mlmodel\">"));
    assert!(html.contains("name=\"drawBaselines\""));
    assert!(!html.contains(" checked"));
}

#[tokio::test]
async fn test_annotate_page_shows_listing() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend)
        .oneshot(multipart_request(
            "/annotate",
            &[
                Part::file("page.png", png_bytes(40, 30)),
                Part::text("drawBaselines", "true"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<strong>Line 1</strong>"));
    assert!(html.contains("<strong>Region 1</strong>"));
    assert!(html.contains("Baseline: [(4, 20), (28, 20)]"));
    assert_eq!(html.matches("data:image/png;base64,").count(), 2);
    assert!(html.contains(" checked>"));
}

#[tokio::test]
async fn test_annotate_page_error_block() {
    let backend = FakeBackend::new(scenario_layout());
    let response = app(&backend)
        .oneshot(multipart_request(
            "/annotate",
            &[Part::file("scan.bmp", vec![0x42, 0x4D, 0x00, 0x00])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
    assert!(backend.calls().is_empty());
}
