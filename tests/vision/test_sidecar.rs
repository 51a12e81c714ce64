// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sidecar client against a local stand-in server

use super::support::{scenario_layout, white_page};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use ocr_overlay::vision::{
    BackendError, CachingLoader, ModelLoader, OcrPipeline, SidecarBackend,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Recorded {
    fn push(&self, route: &str, body: Value) {
        self.requests
            .lock()
            .unwrap()
            .push(json!({ "route": route, "body": body }));
    }

    fn bodies(&self, route: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r["route"] == route)
            .map(|r| r["body"].clone())
            .collect()
    }

    fn routes(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["route"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn load(State(rec): State<Recorded>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    rec.push("load", body.clone());
    if body["path"].as_str().unwrap_or_default().contains("missing") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such model file" })),
        );
    }
    let handle = format!(
        "{}:{}",
        body["kind"].as_str().unwrap_or("unknown"),
        body["path"].as_str().unwrap_or_default()
    );
    (StatusCode::OK, Json(json!({ "handle": handle })))
}

async fn segment(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.push("segment", json!({ "handle": body["handle"] }));
    Json(json!({
        "lines": [
            {"boundary": [[2.7, 2.2], [30, 2], [30, 10], [2, 10]], "baseline": null, "tags": {}},
            {"boundary": [[2, 14], [30, 14], [30, 24], [2, 24]],
             "baseline": [[4, 20], [28, 20]], "tags": {"type": "default"}}
        ],
        "regions": {
            "paragraph": [{"boundary": [[0, 0], [36, 0], [36, 28], [0, 28]], "tags": {}}]
        }
    }))
}

async fn open_session(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let image_len = body["image"].as_str().map(str::len).unwrap_or(0);
    rec.push("session", json!({ "handle": body["handle"], "image_len": image_len }));
    Json(json!({ "session": format!("session-for-{}", body["handle"].as_str().unwrap_or("")) }))
}

async fn recognize(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let line = body["line"].clone();
    rec.push("recognize", body.clone());
    let first_x = line["boundary"][0][0].as_i64().unwrap_or(-1);
    Json(json!({ "text": format!("starts at {}", first_x) }))
}

async fn close_session(State(rec): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
    rec.push("close", body);
    StatusCode::NO_CONTENT
}

async fn unload(State(rec): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
    rec.push("unload", body);
    StatusCode::NO_CONTENT
}

async fn spawn_sidecar() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/v1/models/load", post(load))
        .route("/v1/segment", post(segment))
        .route("/v1/models/unload", post(unload))
        .route("/v1/recognize/session", post(open_session))
        .route("/v1/recognize/session/close", post(close_session))
        .route("/v1/recognize", post(recognize))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), recorded)
}

#[tokio::test]
async fn test_health_check() {
    let (url, _) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    assert!(backend.health_check().await);
}

#[tokio::test]
async fn test_full_run_through_sidecar() {
    let (url, recorded) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    let pipeline = OcrPipeline::new(Arc::new(backend));

    let output = pipeline
        .run(&white_page(40, 30), "models/seg.mlmodel", "models/rec.mlmodel", true)
        .await
        .unwrap();

    assert_eq!(
        recorded.routes()[..6],
        ["load", "load", "segment", "session", "recognize", "recognize"]
    );
    assert_eq!(output.line_count, 2);
    assert_eq!(output.region_count, 1);
    // fractional coordinates are truncated
    assert_eq!(output.entries[0].text(), Some("starts at 2"));
    assert_eq!(output.entries[1].entry_type, "default");

    let loads = recorded.bodies("load");
    assert_eq!(loads[0]["kind"], "segmentation");
    assert_eq!(loads[1]["kind"], "recognition");
    assert_eq!(
        recorded.bodies("segment")[0]["handle"],
        "segmentation:models/seg.mlmodel"
    );

    // page image goes up once, lines reference the session
    let sessions = recorded.bodies("session");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["handle"], "recognition:models/rec.mlmodel");
    assert!(sessions[0]["image_len"].as_u64().unwrap() > 0);
    for body in recorded.bodies("recognize") {
        assert_eq!(body["session"], "session-for-recognition:models/rec.mlmodel");
        assert!(body.get("image").is_none());
        assert!(body.get("handle").is_none());
    }
}

#[tokio::test]
async fn test_handles_and_session_released_after_run() {
    let (url, recorded) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    let releases = backend.pending_releases();
    let pipeline = OcrPipeline::new(Arc::new(backend));

    for _ in 0..2 {
        pipeline
            .run(&white_page(40, 30), "models/seg.mlmodel", "models/rec.mlmodel", false)
            .await
            .unwrap();
    }
    assert!(releases.settle(Duration::from_secs(5)).await);
    assert_eq!(releases.pending(), 0);

    let mut unloaded: Vec<String> = recorded
        .bodies("unload")
        .iter()
        .map(|body| body["id"].as_str().unwrap_or_default().to_string())
        .collect();
    unloaded.sort();
    assert_eq!(
        unloaded,
        vec![
            "recognition:models/rec.mlmodel",
            "recognition:models/rec.mlmodel",
            "segmentation:models/seg.mlmodel",
            "segmentation:models/seg.mlmodel",
        ]
    );
    assert_eq!(recorded.bodies("close").len(), 2);
    assert_eq!(
        recorded.bodies("close")[0]["id"],
        "session-for-recognition:models/rec.mlmodel"
    );
}

#[tokio::test]
async fn test_cached_handle_released_on_eviction() {
    let (url, recorded) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    let releases = backend.pending_releases();
    let loader = CachingLoader::new(backend, 1);

    drop(loader.load_segmentation_model("models/a.mlmodel").await.unwrap());
    assert!(releases.settle(Duration::from_secs(5)).await);
    assert!(recorded.bodies("unload").is_empty());

    drop(loader.load_segmentation_model("models/b.mlmodel").await.unwrap());
    assert!(releases.settle(Duration::from_secs(5)).await);
    let unloaded = recorded.bodies("unload");
    assert_eq!(unloaded.len(), 1);
    assert_eq!(unloaded[0]["id"], "segmentation:models/a.mlmodel");
}

#[tokio::test]
async fn test_recognition_is_lazy() {
    let (url, recorded) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    let recognizer = backend
        .load_recognition_model("models/rec.mlmodel")
        .await
        .unwrap();

    let image = white_page(40, 30);
    let layout = scenario_layout();
    let stream = recognizer.recognize(&image, &layout);
    assert_eq!(recorded.routes(), vec!["load"]);

    let predictions: Vec<_> = stream.collect().await;
    assert_eq!(predictions.len(), 2);
    assert_eq!(
        recorded.routes()[..4],
        ["load", "session", "recognize", "recognize"]
    );
}

#[tokio::test]
async fn test_empty_layout_opens_no_session() {
    let (url, recorded) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();
    let recognizer = backend
        .load_recognition_model("models/rec.mlmodel")
        .await
        .unwrap();

    let image = white_page(10, 10);
    let layout = ocr_overlay::vision::LayoutResult::default();
    let predictions: Vec<_> = recognizer.recognize(&image, &layout).collect().await;
    assert!(predictions.is_empty());
    assert_eq!(recorded.routes(), vec!["load"]);
}

#[tokio::test]
async fn test_rejected_load_carries_message() {
    let (url, _) = spawn_sidecar().await;
    let backend = SidecarBackend::new(&url, Duration::from_secs(5)).unwrap();

    let err = match backend.load_segmentation_model("models/missing.mlmodel").await {
        Err(e) => e,
        Ok(_) => panic!("load should fail"),
    };
    match err {
        BackendError::Rejected { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such model file");
        }
        other => panic!("unexpected error: {}", other),
    }
}
