// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Application configuration
//!
//! Configuration is read once at startup: a TOML file (optional) provides the
//! base values, then `OVERLAY_*` environment variables override individual
//! fields. Nothing is reloaded while the process runs.

pub mod registry;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use registry::{ModelDescriptor, ModelKind, ModelRegistry, UnknownModelError};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "OVERLAY_CONFIG";

use crate::vision::image_utils::MAX_IMAGE_SIZE as DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the segmentation / recognition runtime lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8600".to_string(),
            timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pipeline behaviour knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model handles kept between requests; 0 loads fresh every time
    pub model_cache_capacity: usize,
    /// Pipeline runs allowed at once
    pub max_concurrent_requests: usize,
    /// Baseline stroke width in pixels
    pub baseline_width: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_cache_capacity: 0,
            max_concurrent_requests: 1,
            baseline_width: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub pipeline: PipelineConfig,
    pub models: ModelRegistry,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup loading: optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `OVERLAY_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test maps)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("OVERLAY_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("OVERLAY_PORT") {
            self.server.port = parse_field("OVERLAY_PORT", &val)?;
        }
        if let Some(val) = lookup("OVERLAY_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_field("OVERLAY_MAX_UPLOAD_BYTES", &val)?;
        }
        if let Some(val) = lookup("OVERLAY_BACKEND_URL") {
            self.backend.endpoint = val;
        }
        if let Some(val) = lookup("OVERLAY_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_field("OVERLAY_BACKEND_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = lookup("OVERLAY_MODEL_CACHE") {
            self.pipeline.model_cache_capacity = parse_field("OVERLAY_MODEL_CACHE", &val)?;
        }
        if let Some(val) = lookup("OVERLAY_MAX_CONCURRENT") {
            self.pipeline.max_concurrent_requests = parse_field("OVERLAY_MAX_CONCURRENT", &val)?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host", "must not be empty"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(invalid("server.max_upload_bytes", "must be greater than 0"));
        }
        if self.backend.endpoint.trim().is_empty() {
            return Err(invalid("backend.endpoint", "must not be empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs", "must be greater than 0"));
        }
        if self.pipeline.max_concurrent_requests == 0 {
            return Err(invalid(
                "pipeline.max_concurrent_requests",
                "must be greater than 0",
            ));
        }
        if self.pipeline.baseline_width == 0 {
            return Err(invalid("pipeline.baseline_width", "must be greater than 0"));
        }
        self.models.validate()
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        field: field.to_string(),
        message: format!("cannot parse '{}'", value),
    })
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}
