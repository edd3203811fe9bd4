// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class-index to label mapping
//!
//! Position `i` of the label index names output position `i` of the
//! classifier's probability vector. Loading rejects anything that would
//! break that correspondence (gaps, duplicates, non-numeric keys).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::error::ClassifyError;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabelIndex {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// Immutable class-index to label mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex {
    labels: Vec<String>,
}

impl LabelIndex {
    /// Build from labels already in class-index order
    pub fn new(labels: Vec<String>) -> Result<Self, ClassifyError> {
        if labels.is_empty() {
            return Err(ClassifyError::ArtifactLoad(
                "label index is empty".to_string(),
            ));
        }
        if let Some(pos) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(ClassifyError::ArtifactLoad(format!(
                "label for class {} is empty",
                pos
            )));
        }
        Ok(Self { labels })
    }

    /// Load a label index from disk
    ///
    /// `.txt` files hold one label per line; anything else is parsed as JSON,
    /// either an array or an object keyed by class index.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifyError::ArtifactLoad(format!(
                "label index not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifyError::ArtifactLoad(format!(
                "failed to read label index {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);

        if is_text {
            Self::from_lines(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parse one label per line, skipping blank trailing lines
    pub fn from_lines(content: &str) -> Result<Self, ClassifyError> {
        let labels: Vec<String> = content
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self::new(labels)
    }

    /// Parse a JSON array or `{"0": "...", "1": "..."}` object
    pub fn from_json(content: &str) -> Result<Self, ClassifyError> {
        let raw: RawLabelIndex = serde_json::from_str(content).map_err(|e| {
            ClassifyError::ArtifactLoad(format!("label index is not valid JSON: {}", e))
        })?;

        match raw {
            RawLabelIndex::List(labels) => Self::new(labels),
            RawLabelIndex::Map(map) => {
                let mut indexed = BTreeMap::new();
                for (key, label) in map {
                    let index: usize = key.trim().parse().map_err(|_| {
                        ClassifyError::ArtifactLoad(format!(
                            "label index key '{}' is not a class index",
                            key
                        ))
                    })?;
                    if indexed.insert(index, label).is_some() {
                        return Err(ClassifyError::ArtifactLoad(format!(
                            "class index {} appears more than once",
                            index
                        )));
                    }
                }

                // Keys must be exactly 0..N-1
                for (expected, actual) in indexed.keys().enumerate() {
                    if expected != *actual {
                        return Err(ClassifyError::ArtifactLoad(format!(
                            "label index has no entry for class {}",
                            expected
                        )));
                    }
                }

                Self::new(indexed.into_values().collect())
            }
        }
    }

    /// Look up the label for a class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Look up a label, failing with `LabelIndex` outside the domain
    pub fn label_for(&self, index: usize) -> Result<&str, ClassifyError> {
        self.get(index).ok_or(ClassifyError::LabelIndex {
            index,
            size: self.labels.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(String::as_str).enumerate()
    }

    /// Ensure the label count matches the classifier's output width
    pub fn check_width(&self, num_classes: usize) -> Result<(), ClassifyError> {
        if self.labels.len() != num_classes {
            return Err(ClassifyError::ArtifactLoad(format!(
                "label index has {} entries but the classifier outputs {} classes",
                self.labels.len(),
                num_classes
            )));
        }
        Ok(())
    }
}
