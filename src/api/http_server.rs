// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::classify::{classify_handler, classify_upload_handler};
use super::page::INDEX_HTML;
use crate::config::AppConfig;
use crate::input::ImageFetcher;
use crate::vision::FruitClassifier;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<FruitClassifier>,
    pub fetcher: ImageFetcher,
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(classifier: Arc<FruitClassifier>, fetcher: ImageFetcher) -> Self {
        let max_image_bytes = fetcher.max_bytes();
        Self {
            classifier,
            fetcher,
            max_image_bytes,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Room for base64 and multipart overhead on top of the raw image limit
    let body_limit = state.max_image_bytes.saturating_mul(2);

    Router::new()
        // Upload page
        .route("/", get(index_handler))
        // Health check
        .route("/health", get(health_handler))
        // Classification endpoints
        .route("/v1/classify", post(classify_handler))
        .route("/v1/classify/upload", post(classify_upload_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = config.bind_address().parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🍎 Fruit classifier listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::version::VERSION_NUMBER,
        "model": state.classifier.model_name(),
        "modelLoaded": state.classifier.is_ready(),
        "backgroundRemoval": state.classifier.removes_background(),
    }))
}
