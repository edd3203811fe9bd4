// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use fruit_classifier::{
    api::{start_server, AppState},
    config::AppConfig,
    input::ImageFetcher,
    vision::FruitClassifier,
};
use std::{env, sync::Arc};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🍉 Starting Fruit Classifier...\n");
    println!("📦 BUILD VERSION: {}", fruit_classifier::version::VERSION);
    println!("📅 Build Date: {}", fruit_classifier::version::BUILD_DATE);
    println!();

    let config = AppConfig::from_env();
    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;

    info!(
        "Classifier model: {} (labels: {}, preprocessing: {})",
        config.model_path.display(),
        config.labels_path.display(),
        config.preprocessing
    );
    info!("Background removal: {}", config.background_removal_mode());

    let classifier = Arc::new(FruitClassifier::from_config(&config)?);
    let fetcher = ImageFetcher::new(config.fetch_timeout_secs, config.max_image_bytes)?;

    // Fire-and-forget load; a failure surfaces again on the first request
    if config.warm_up {
        let warm = classifier.clone();
        tokio::task::spawn_blocking(move || match warm.warm_up() {
            Ok(model) => info!("✅ Model warm-up complete ({} labels)", model.labels.len()),
            Err(e) => error!("❌ Model warm-up failed: {}", e),
        });
    }

    let state = AppState::new(classifier, fetcher);
    start_server(&config, state).await
}
