// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Browser pages: the upload form and the annotated result

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pulldown_cmark::{html, Options, Parser};
use std::sync::Arc;

use super::errors::ApiError;
use super::http_server::AppState;
use super::ocr::{run_ocr, OcrForm, OcrResponse};
use crate::config::{ModelKind, ModelRegistry};
use crate::vision::detect_format;
use crate::vision::image_utils::mime_type;

const TITLE: &str = "Page Segmentation and Recognition";

const STYLE: &str = "body{font-family:sans-serif;margin:2em;max-width:1200px}\
    .images{display:flex;gap:1em}.images figure{flex:1;margin:0}\
    .images img{max-width:100%;border:1px solid #ccc}\
    .error{color:#a00;border:1px solid #a00;padding:1em}\
    label{display:block;margin:.5em 0}";

/// HTML error block carrying the API status code
pub struct PageError(pub ApiError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = format!(
            "<div class=\"error\"><strong>Error:</strong> {}</div>\n<p><a href=\"/\">Back</a></p>",
            ammonia::clean_text(&self.0.to_string())
        );
        (status, Html(layout(&body))).into_response()
    }
}

/// GET /
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(layout(&upload_form(state.registry(), None)))
}

/// POST /annotate
pub async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Html<String>, PageError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let form = OcrForm::from_multipart(multipart).await.map_err(PageError)?;
    let response = run_ocr(&state, &form, &request_id)
        .await
        .map_err(PageError)?;

    let uploaded = form.validate().map_err(PageError)?;
    let body = format!(
        "{}\n{}",
        result_section(uploaded, &response),
        upload_form(state.registry(), Some(&form))
    );
    Ok(Html(layout(&body)))
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{style}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = TITLE,
        style = STYLE,
        body = body
    )
}

fn upload_form(registry: &ModelRegistry, previous: Option<&OcrForm>) -> String {
    let selected_seg = previous.and_then(|f| f.segmentation_model.as_deref());
    let selected_rec = previous.and_then(|f| f.recognition_model.as_deref());
    let checked = if previous.map(|f| f.draw_baselines).unwrap_or(false) {
        " checked"
    } else {
        ""
    };

    format!(
        "<form action=\"/annotate\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <label>Upload an image <input type=\"file\" name=\"image\" accept=\".png,.jpg,.jpeg\" required></label>\n\
         <label>Select segmentation model <select name=\"segmentationModel\">{seg}</select></label>\n\
         <label>Select recognition model <select name=\"recognitionModel\">{rec}</select></label>\n\
         <label><input type=\"checkbox\" name=\"drawBaselines\" value=\"true\"{checked}> Draw baselines</label>\n\
         <button type=\"submit\">Run</button>\n</form>",
        seg = model_options(registry, ModelKind::Segmentation, selected_seg),
        rec = model_options(registry, ModelKind::Recognition, selected_rec),
        checked = checked
    )
}

fn model_options(registry: &ModelRegistry, kind: ModelKind, selected: Option<&str>) -> String {
    registry
        .list(kind)
        .iter()
        .map(|name| {
            let escaped = ammonia::clean_text(name);
            let marker = if Some(name.as_str()) == selected {
                " selected"
            } else {
                ""
            };
            format!("<option value=\"{0}\"{1}>{0}</option>", escaped, marker)
        })
        .collect()
}

fn result_section(uploaded: &[u8], response: &OcrResponse) -> String {
    let uploaded_mime = detect_format(uploaded)
        .map(mime_type)
        .unwrap_or("image/png");

    format!(
        "<div class=\"images\">\n\
         <figure><img src=\"data:{mime};base64,{original}\" alt=\"Uploaded image\">\
         <figcaption>Uploaded image</figcaption></figure>\n\
         <figure><img src=\"data:image/png;base64,{annotated}\" alt=\"Annotated image\">\
         <figcaption>Segmented image</figcaption></figure>\n</div>\n\
         <h2>Lines and regions</h2>\n<div class=\"listing\">{listing}</div>",
        mime = uploaded_mime,
        original = STANDARD.encode(uploaded),
        annotated = response.annotated_image,
        listing = render_markdown(&response.markdown)
    )
}

/// Markdown to sanitized HTML
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);
    ammonia::clean(&rendered)
}
