// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::input::{ImageFetcher, InputSource};
use crate::vision::{FruitClassifier, PredictionResult};

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Local image file (PNG or JPEG)
    #[arg(conflicts_with = "url", required_unless_present = "url")]
    pub path: Option<PathBuf>,

    /// Image URL to fetch instead of a local file
    #[arg(long)]
    pub url: Option<String>,

    /// Classify the image as-is, without replacing the background
    #[arg(long)]
    pub no_background_removal: bool,
}

/// Format a prediction the way the CLI prints it
pub fn format_prediction(prediction: &PredictionResult) -> String {
    format!("{} ({}%)", prediction.label, prediction.confidence)
}

pub async fn classify(args: ClassifyArgs, mut config: AppConfig) -> Result<()> {
    if args.no_background_removal {
        config.remove_background = false;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    let mut source = InputSource::default();
    if let Some(ref path) = args.path {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        source.upload_file(bytes);
    } else if let Some(ref url) = args.url {
        source.enter_url(url);
    }

    let bytes = match source {
        InputSource::File(bytes) => bytes,
        InputSource::Url(url) => {
            let fetcher = ImageFetcher::new(config.fetch_timeout_secs, config.max_image_bytes)?;
            fetcher.fetch(&url).await?
        }
        InputSource::NoInput => return Err(anyhow!("image is empty")),
    };

    let classifier = Arc::new(FruitClassifier::from_config(&config)?);
    info!(
        "Classifying with '{}' (background removal: {})",
        classifier.model_name(),
        classifier.removes_background()
    );

    let prediction =
        tokio::task::spawn_blocking(move || classifier.classify_bytes(&bytes)).await??;

    println!("{}", format_prediction(&prediction));
    Ok(())
}

pub async fn list_labels(config: AppConfig) -> Result<()> {
    config.validate().map_err(|e| anyhow!(e))?;
    let classifier = FruitClassifier::from_config(&config)?;

    let labels = tokio::task::spawn_blocking(move || classifier.labels()).await??;
    for (index, label) in labels.iter().enumerate() {
        println!("{:>3}  {}", index, label);
    }
    Ok(())
}
