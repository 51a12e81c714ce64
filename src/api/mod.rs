// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod ocr;
pub mod page;

pub use errors::{ApiError, ApiErrorResponse, ErrorResponse};
pub use handlers::{HealthResponse, ModelsResponse};
pub use http_server::{create_app, shutdown_signal, start_server, AppState};
pub use ocr::{ocr_handler, OcrForm, OcrResponse};
