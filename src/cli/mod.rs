// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod annotate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AppConfig, ModelKind};
use crate::vision::SidecarBackend;

/// Page segmentation and recognition overlay CLI
#[derive(Parser, Debug)]
#[command(name = "overlay-cli")]
#[command(version)]
#[command(about = "Annotate page images with detected lines and regions", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "OVERLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model sidecar URL, overriding the configured one
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the registered segmentation and recognition models
    Models,

    /// Segment and recognize one image, writing the annotated page
    Annotate(annotate::AnnotateArgs),

    /// Check that the model sidecar is reachable
    Health,
}

impl Cli {
    /// Configuration file and environment, then command-line overrides
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.backend_url {
            config.backend.endpoint = url.clone();
            config.validate()?;
        }
        Ok(config)
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    match cli.command {
        Commands::Models => {
            print!("{}", format_model_listing(&config));
            Ok(())
        }
        Commands::Annotate(args) => annotate::run(args, &config).await,
        Commands::Health => check_health(&config).await,
    }
}

pub fn format_model_listing(config: &AppConfig) -> String {
    let mut out = String::new();
    for kind in [ModelKind::Segmentation, ModelKind::Recognition] {
        out.push_str(&format!("{} models:\n", kind));
        let default = config.models.default_model(kind);
        for descriptor in config.models.descriptors(kind) {
            let marker = if Some(descriptor.name.as_str()) == default {
                " (default)"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {}{} -> {}\n",
                descriptor.name, marker, descriptor.path
            ));
        }
    }
    out
}

async fn check_health(config: &AppConfig) -> Result<()> {
    let backend = SidecarBackend::from_config(&config.backend)?;
    if backend.health_check().await {
        println!("Model sidecar at {} is healthy", backend.endpoint());
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Model sidecar at {} is not reachable",
            backend.endpoint()
        ))
    }
}
