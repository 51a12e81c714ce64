// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model registry: display name → artifact path, per model kind
//!
//! The registry is built once from configuration at process start and is
//! read-only afterwards. Listing order is the configured order, and the first
//! entry of each kind is the default selection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::ConfigError;

/// Which model family a descriptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Segmentation,
    Recognition,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Segmentation => "segmentation",
            ModelKind::Recognition => "recognition",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable model and where its artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Name shown in selectors
    #[serde(alias = "display_name")]
    pub name: String,
    /// Artifact location handed to the model loader
    #[serde(alias = "artifact_path")]
    pub path: String,
}

impl ModelDescriptor {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// Lookup miss: the display name is not registered for that kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} model '{name}'")]
pub struct UnknownModelError {
    pub kind: ModelKind,
    pub name: String,
}

/// Static model tables, one per kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default = "default_segmentation_models")]
    segmentation: Vec<ModelDescriptor>,
    #[serde(default = "default_recognition_models")]
    recognition: Vec<ModelDescriptor>,
}

fn default_segmentation_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("1col_442_sam_v1.mlmodel", "models/1col_442_sam_v1.mlmodel"),
        ModelDescriptor::new("ubma_sam_v4.mlmodel", "models/ubma_sam_v4.mlmodel"),
    ]
}

fn default_recognition_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("sinai_sam_rec_v4.mlmodel", "models/sinai_sam_rec_v4.mlmodel"),
        ModelDescriptor::new("sinai_sam_rec_v2.mlmodel", "models/sinai_sam_rec_v2.mlmodel"),
    ]
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            segmentation: default_segmentation_models(),
            recognition: default_recognition_models(),
        }
    }
}

impl ModelRegistry {
    /// Build a registry from explicit tables, rejecting invalid entries
    pub fn new(
        segmentation: Vec<ModelDescriptor>,
        recognition: Vec<ModelDescriptor>,
    ) -> Result<Self, ConfigError> {
        let registry = Self {
            segmentation,
            recognition,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Check names and paths are non-empty and names are unique per kind
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in [ModelKind::Segmentation, ModelKind::Recognition] {
            let mut seen = HashSet::new();
            for descriptor in self.descriptors(kind) {
                if descriptor.name.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        field: format!("models.{}", kind),
                        message: "model name must not be empty".to_string(),
                    });
                }
                if descriptor.path.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        field: format!("models.{}", kind),
                        message: format!("model '{}' has an empty path", descriptor.name),
                    });
                }
                if !seen.insert(descriptor.name.as_str()) {
                    return Err(ConfigError::Invalid {
                        field: format!("models.{}", kind),
                        message: format!("duplicate model name '{}'", descriptor.name),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn descriptors(&self, kind: ModelKind) -> &[ModelDescriptor] {
        match kind {
            ModelKind::Segmentation => &self.segmentation,
            ModelKind::Recognition => &self.recognition,
        }
    }

    /// Display names for a kind, in configured order
    pub fn list(&self, kind: ModelKind) -> Vec<String> {
        self.descriptors(kind)
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn list_segmentation_models(&self) -> Vec<String> {
        self.list(ModelKind::Segmentation)
    }

    pub fn list_recognition_models(&self) -> Vec<String> {
        self.list(ModelKind::Recognition)
    }

    /// First listed model of a kind, the selector's initial value
    pub fn default_model(&self, kind: ModelKind) -> Option<&str> {
        self.descriptors(kind).first().map(|d| d.name.as_str())
    }

    /// Resolve a display name to its artifact path
    pub fn resolve(&self, name: &str, kind: ModelKind) -> Result<&str, UnknownModelError> {
        self.descriptors(kind)
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.path.as_str())
            .ok_or_else(|| UnknownModelError {
                kind,
                name: name.to_string(),
            })
    }
}
