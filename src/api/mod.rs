// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP presentation layer

pub mod classify;
pub mod errors;
pub mod http_server;
pub mod page;

pub use classify::{ClassifyRequest, ClassifyResponse};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, start_server, AppState};
