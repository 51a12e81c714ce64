// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR API endpoint module
//!
//! Provides POST /v1/ocr for annotating page images.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{ocr_handler, run_ocr};
pub use request::{parse_flag, ModelSelection, OcrForm};
pub use response::OcrResponse;
