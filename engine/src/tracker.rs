//! Per-document pipeline stages.
//!
//! A document absent from the tracker is idle. [`PipelineGuard`] is the only
//! way in: it inserts on entry and removes on drop, so a document never stays
//! in the tracker after its pipeline settles or is cancelled. Every removal
//! wakes the saves queued behind it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ferrule_types::DocumentId;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Waiting on the formatter or on edit application.
    FormatPending,
    /// The pipeline's own re-save is in flight.
    SynthSaving,
}

#[derive(Debug, Default)]
pub struct DocumentTracker {
    stages: HashMap<DocumentId, PipelineStage>,
    settled: Arc<Notify>,
}

impl DocumentTracker {
    #[must_use]
    pub fn stage(&self, document: &DocumentId) -> Option<PipelineStage> {
        self.stages.get(document).copied()
    }

    #[must_use]
    pub fn is_synth_saving(&self, document: &DocumentId) -> bool {
        self.stage(document) == Some(PipelineStage::SynthSaving)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Notified whenever a document leaves the pipeline.
    pub(crate) fn settled(&self) -> Arc<Notify> {
        Arc::clone(&self.settled)
    }
}

pub(crate) type SharedTracker = Arc<Mutex<DocumentTracker>>;

pub(crate) fn lock(tracker: &SharedTracker) -> std::sync::MutexGuard<'_, DocumentTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a document in the pipeline until dropped.
#[derive(Debug)]
pub(crate) struct PipelineGuard {
    tracker: SharedTracker,
    document: DocumentId,
}

impl PipelineGuard {
    /// Move `document` to [`PipelineStage::FormatPending`].
    ///
    /// Returns `None` if the document is already in the pipeline.
    pub fn enter(tracker: &SharedTracker, document: DocumentId) -> Option<Self> {
        let mut guard = lock(tracker);
        if guard.stages.contains_key(&document) {
            return None;
        }
        guard
            .stages
            .insert(document.clone(), PipelineStage::FormatPending);
        Some(Self {
            tracker: Arc::clone(tracker),
            document,
        })
    }

    /// Mark the document as saving on the pipeline's behalf. Call right
    /// before requesting the save.
    pub fn begin_synthetic_save(&self) {
        lock(&self.tracker)
            .stages
            .insert(self.document.clone(), PipelineStage::SynthSaving);
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        let settled = {
            let mut tracker = lock(&self.tracker);
            tracker.stages.remove(&self.document);
            tracker.settled()
        };
        settled.notify_waiters();
    }
}
