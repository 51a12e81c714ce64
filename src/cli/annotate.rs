// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{AppConfig, ModelKind, ModelRegistry};
use crate::vision::image_utils::encode_png;
use crate::vision::{
    decode_upload, to_markdown, DisplayLine, ModelLoader, OcrPipeline, SidecarBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

/// Arguments for the annotate command
#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Page image (PNG or JPEG)
    #[arg(long)]
    pub image: PathBuf,

    /// Segmentation model display name (defaults to the first listed)
    #[arg(long)]
    pub segmentation_model: Option<String>,

    /// Recognition model display name (defaults to the first listed)
    #[arg(long)]
    pub recognition_model: Option<String>,

    /// Draw and list baselines
    #[arg(long)]
    pub draw_baselines: bool,

    /// Where to write the annotated PNG
    #[arg(long, default_value = "annotated.png")]
    pub output: PathBuf,

    /// Listing format
    #[arg(long, value_enum, default_value = "markdown")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateReport {
    pub segmentation_model: String,
    pub recognition_model: String,
    pub output: PathBuf,
    pub line_count: usize,
    pub region_count: usize,
    pub processing_time_ms: u64,
    pub entries: Vec<DisplayLine>,
}

impl AnnotateReport {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Markdown => Ok(to_markdown(&self.entries)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

pub async fn run(args: AnnotateArgs, config: &AppConfig) -> Result<()> {
    let backend = SidecarBackend::from_config(&config.backend)?;
    let releases = backend.pending_releases();
    let report = annotate_with(&args, config, Arc::new(backend)).await;

    if !releases.settle(Duration::from_secs(5)).await {
        warn!("{} sidecar releases still pending", releases.pending());
    }
    println!("{}", report?.render(args.format)?);
    Ok(())
}

/// Run one annotation against any model loader
pub async fn annotate_with(
    args: &AnnotateArgs,
    config: &AppConfig,
    loader: Arc<dyn ModelLoader>,
) -> Result<AnnotateReport> {
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let file_name = args.image.file_name().and_then(|name| name.to_str());
    let (image, info) = decode_upload(file_name, &bytes, config.server.max_upload_bytes)?;
    info!("Loaded {}: {}x{}", args.image.display(), info.width, info.height);

    let (segmentation_model, seg_path) = pick(
        &config.models,
        ModelKind::Segmentation,
        args.segmentation_model.as_deref(),
    )?;
    let (recognition_model, rec_path) = pick(
        &config.models,
        ModelKind::Recognition,
        args.recognition_model.as_deref(),
    )?;

    let pipeline =
        OcrPipeline::new(loader).with_baseline_width(config.pipeline.baseline_width);
    let output = pipeline
        .run(&image, &seg_path, &rec_path, args.draw_baselines)
        .await?;

    write_png(&args.output, &encode_png(&output.annotated)?)?;
    info!("Annotated image written to {}", args.output.display());

    Ok(AnnotateReport {
        segmentation_model,
        recognition_model,
        output: args.output.clone(),
        line_count: output.line_count,
        region_count: output.region_count,
        processing_time_ms: output.processing_time_ms,
        entries: output.entries,
    })
}

fn pick(
    registry: &ModelRegistry,
    kind: ModelKind,
    requested: Option<&str>,
) -> Result<(String, String)> {
    let name = requested
        .or_else(|| registry.default_model(kind))
        .ok_or_else(|| anyhow!("No {} models are configured", kind))?;
    let path = registry.resolve(name, kind)?;
    Ok((name.to_string(), path.to_string()))
}

fn write_png(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
