// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image input handling
//!
//! An image reaches the classifier either as uploaded bytes or as a URL that
//! is fetched over HTTP. `InputSource` keeps the two mutually exclusive.

pub mod fetcher;
pub mod source;

pub use fetcher::{FetchError, ImageFetcher};
pub use source::InputSource;
