// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fruit classification endpoint module
//!
//! Provides POST /v1/classify (JSON) and POST /v1/classify/upload (multipart).

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{classify_handler, classify_upload_handler};
pub use request::ClassifyRequest;
pub use response::ClassifyResponse;
