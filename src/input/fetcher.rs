// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP retrieval of URL-supplied images
//!
//! Plain GET with a timeout, a redirect limit and a body size cap. No
//! retries and no authentication.

use bytes::{Bytes, BytesMut};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Image fetch error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// URL could not be parsed or uses a scheme other than http/https
    InvalidUrl(String),
    /// Request timed out
    Timeout(String),
    /// HTTP request error
    HttpError(String),
    /// HTTP non-success status
    HttpStatus(u16, String),
    /// Response body exceeds the size limit
    TooLarge(usize, usize),
    /// Response body is empty
    Empty(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "Invalid image URL: {}", url),
            Self::Timeout(url) => write!(f, "Timeout fetching: {}", url),
            Self::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            Self::HttpStatus(code, url) => write!(f, "HTTP {} for: {}", code, url),
            Self::TooLarge(size, max) => {
                write!(f, "Image too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::Empty(url) => write!(f, "Empty response from: {}", url),
        }
    }
}

impl std::error::Error for FetchError {}

/// Downloads image bytes from http/https URLs
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// Create a new image fetcher
    pub fn new(timeout_secs: u64, max_bytes: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("fruit-classifier/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::HttpError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Parse and check that a URL is fetchable
    pub fn validate_url(url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url.trim()).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        if !["http", "https"].contains(&parsed.scheme()) || parsed.host_str().is_none() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        Ok(parsed)
    }

    /// Fetch the raw bytes behind `url`
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Self::validate_url(url)?;

        debug!("Fetching image from: {}", parsed);

        let mut response = self.client.get(parsed.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(FetchError::TooLarge(length as usize, self.max_bytes));
            }
        }

        // Content-Length may be absent or wrong; enforce the cap while reading
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::HttpError(e.to_string())
            }
        })? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge(body.len() + chunk.len(), self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(FetchError::Empty(url.to_string()));
        }

        info!("Fetched {} bytes from: {}", body.len(), url);
        Ok(body.freeze())
    }
}
