// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Input selection state machine
//!
//! Selecting a file clears any entered URL and entering a URL clears any
//! uploaded file, so at most one source is ever active.

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    #[default]
    NoInput,
    File(Bytes),
    Url(String),
}

impl InputSource {
    /// Select an uploaded file, replacing any URL
    pub fn upload_file(&mut self, bytes: impl Into<Bytes>) {
        let bytes = bytes.into();
        *self = if bytes.is_empty() {
            InputSource::NoInput
        } else {
            InputSource::File(bytes)
        };
    }

    /// Enter a URL, replacing any uploaded file; a blank URL clears the input
    pub fn enter_url(&mut self, url: &str) {
        let url = url.trim();
        *self = if url.is_empty() {
            InputSource::NoInput
        } else {
            InputSource::Url(url.to_string())
        };
    }

    pub fn clear(&mut self) {
        *self = InputSource::NoInput;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, InputSource::NoInput)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InputSource::NoInput => "none",
            InputSource::File(_) => "file",
            InputSource::Url(_) => "url",
        }
    }
}
