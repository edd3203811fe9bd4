// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide cache of loaded classifier artifacts
//!
//! `ModelStore::load` is get-or-load keyed by the artifact identity
//! (`ModelSpec`). The first caller for a spec reads the artifacts from disk;
//! concurrent callers for the same spec block on that single load and then
//! share the resulting instance. Failed loads are returned to the caller and
//! are not cached.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use super::classifier::{Classifier, OnnxClassifier};
use super::error::ClassifyError;
use super::labels::LabelIndex;
use super::preprocessing::Preprocessing;

/// Identity of a classifier artifact: files on disk plus the transform it was trained with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    /// Path to the serialized classifier
    pub model_path: PathBuf,
    /// Path to the class-index to label mapping
    pub labels_path: PathBuf,
    /// Preprocessing transform bundled with this model
    pub preprocessing: Preprocessing,
}

impl ModelSpec {
    pub fn new(
        model_path: impl Into<PathBuf>,
        labels_path: impl Into<PathBuf>,
        preprocessing: Preprocessing,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
            preprocessing,
        }
    }
}

/// A classifier together with its label index, immutable after load
pub struct LoadedModel {
    pub spec: ModelSpec,
    pub classifier: Arc<dyn Classifier>,
    pub labels: LabelIndex,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("spec", &self.spec)
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels.len())
            .finish()
    }
}

/// Reads classifier artifacts from storage
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, spec: &ModelSpec) -> Result<LoadedModel, ClassifyError>;
}

/// Loads ONNX classifiers and label-index files from disk
#[derive(Debug, Clone)]
pub struct OnnxArtifactLoader {
    intra_threads: usize,
}

impl OnnxArtifactLoader {
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }
}

impl Default for OnnxArtifactLoader {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ArtifactLoader for OnnxArtifactLoader {
    fn load(&self, spec: &ModelSpec) -> Result<LoadedModel, ClassifyError> {
        // Labels first: cheap to read, and a missing file fails fast
        let labels = LabelIndex::from_file(&spec.labels_path)?;
        let classifier = OnnxClassifier::load(&spec.model_path, self.intra_threads)?;

        if let Some(num_classes) = classifier.num_classes() {
            labels.check_width(num_classes)?;
        }

        Ok(LoadedModel {
            spec: spec.clone(),
            classifier: Arc::new(classifier),
            labels,
        })
    }
}

type Slot = Arc<Mutex<Option<Arc<LoadedModel>>>>;

/// Get-or-load cache of classifier artifacts
pub struct ModelStore {
    loader: Arc<dyn ArtifactLoader>,
    slots: Mutex<HashMap<ModelSpec, Slot>>,
    disk_loads: AtomicUsize,
}

impl ModelStore {
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
            disk_loads: AtomicUsize::new(0),
        }
    }

    /// Store backed by ONNX Runtime
    pub fn onnx(intra_threads: usize) -> Self {
        Self::new(Arc::new(OnnxArtifactLoader::new(intra_threads)))
    }

    fn slot(&self, spec: &ModelSpec) -> Result<Slot, ClassifyError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ClassifyError::ArtifactLoad("model store lock poisoned".to_string()))?;
        Ok(slots.entry(spec.clone()).or_default().clone())
    }

    /// Return the cached model for `spec`, loading it on first use
    ///
    /// Blocks while another caller is loading the same spec.
    pub fn load(&self, spec: &ModelSpec) -> Result<Arc<LoadedModel>, ClassifyError> {
        let slot = self.slot(spec)?;
        let mut guard = slot
            .lock()
            .map_err(|_| ClassifyError::ArtifactLoad("model slot lock poisoned".to_string()))?;

        if let Some(model) = guard.as_ref() {
            debug!("Model cache hit for {}", spec.model_path.display());
            return Ok(model.clone());
        }

        let started = Instant::now();
        self.disk_loads.fetch_add(1, Ordering::SeqCst);

        match self.loader.load(spec) {
            Ok(model) => {
                let model = Arc::new(model);
                info!(
                    "✅ Model {} loaded with {} labels in {}ms",
                    spec.model_path.display(),
                    model.labels.len(),
                    started.elapsed().as_millis()
                );
                *guard = Some(model.clone());
                Ok(model)
            }
            Err(e) => {
                debug!("Failed to load model {}: {}", spec.model_path.display(), e);
                Err(e)
            }
        }
    }

    /// Cached model for `spec`, without loading
    pub fn get(&self, spec: &ModelSpec) -> Option<Arc<LoadedModel>> {
        let slot = self.slots.lock().ok()?.get(spec)?.clone();
        let guard = slot.try_lock().ok()?;
        guard.clone()
    }

    pub fn is_loaded(&self, spec: &ModelSpec) -> bool {
        self.get(spec).is_some()
    }

    /// Number of times artifacts have been read from storage
    pub fn disk_loads(&self) -> usize {
        self.disk_loads.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("disk_loads", &self.disk_loads())
            .finish_non_exhaustive()
    }
}
