// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod classify;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

/// Fruit classifier CLI
#[derive(Parser, Debug)]
#[command(name = "fruit-cli")]
#[command(version)]
#[command(about = "Classify fruit photos from the command line", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Model artifact overrides (fall back to the environment, then defaults)
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Path to the ONNX classifier
    #[arg(long, global = true, env = "CLASSIFIER_MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Path to the class-index to label mapping
    #[arg(long, global = true, env = "CLASSIFIER_LABELS_PATH")]
    pub labels: Option<PathBuf>,

    /// Preprocessing transform (caffe, torch, tf, raw)
    #[arg(long, global = true, env = "CLASSIFIER_PREPROCESSING")]
    pub preprocessing: Option<String>,

    /// Optional ONNX segmentation model for background removal
    #[arg(long, global = true, env = "SEGMENTATION_MODEL_PATH")]
    pub segmentation_model: Option<PathBuf>,
}

impl ModelArgs {
    /// Apply the overrides on top of `config`
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(ref model) = self.model {
            config.model_path = model.clone();
        }
        if let Some(ref labels) = self.labels {
            config.labels_path = labels.clone();
        }
        if let Some(ref preprocessing) = self.preprocessing {
            config.preprocessing = preprocessing.clone();
        }
        if let Some(ref segmentation_model) = self.segmentation_model {
            config.segmentation_model_path = Some(segmentation_model.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify an image file or URL
    Classify(classify::ClassifyArgs),

    /// List the labels known to the model
    Labels,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.model.apply(AppConfig::from_env());

    match cli.command {
        Commands::Classify(args) => classify::classify(args, config).await,
        Commands::Labels => classify::list_labels(config).await,
    }
}
