// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the OCR overlay service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "line-boundaries",
    "baselines",
    "region-boundaries",
    "model-registry",
    "model-sidecar",
    "model-cache",
    "html-form",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("OCR Overlay {}", VERSION_NUMBER)
}
