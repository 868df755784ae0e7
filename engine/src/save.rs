//! Save Orchestrator: format on save, re-save once, then check.
//!
//! Admission happens synchronously when the save notification arrives:
//! eligibility, the re-entrancy check, and a snapshot of the effective
//! settings. Everything after that runs as one future per save event:
//!
//! 1. Format stage, when `format_on_save` is set and the saved document is
//!    the one in the active editor. Edits are applied to the live buffer and
//!    the document is saved once more. The document is `SynthSaving` for
//!    exactly the duration of that save, so its notification is turned away
//!    at admission. Every failure here is logged and swallowed.
//! 2. Check stage, when `check_on_save` is set. The configured command is
//!    dispatched without waiting for it, and only after stage 1 settled.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use ferrule_toolchain::{RunRequest, ToolRunner};
use ferrule_types::{Document, DocumentId, EffectiveSettings, ToolCommand, is_eligible};
use tokio::sync::watch;

use crate::format::FormatProvider;
use crate::surface::EditorSurface;
use crate::tracker::{self, DocumentTracker, PipelineGuard, PipelineStage, SharedTracker};

/// Starts post-save check commands.
pub trait CheckDispatcher: Send + Sync + 'static {
    /// Start `command` and return without waiting for it.
    fn dispatch_check(&self, command: ToolCommand);
}

impl CheckDispatcher for ToolRunner {
    fn dispatch_check(&self, command: ToolCommand) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(command, RunRequest::default()).await {
                tracing::warn!(%command, "Check command did not start: {e}");
            }
        });
    }
}

/// Receives save notifications from the editing surface.
pub trait SaveListener: Send + Sync {
    /// Returns whether the save was admitted into the pipeline.
    fn document_saved(&self, document: &Document) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStage {
    /// `format_on_save` is off.
    Disabled,
    /// The saved document is not in the active editor.
    NotActiveEditor,
    /// Edits applied and the document re-saved.
    Formatted { edits: usize },
    FormatFailed,
    ApplyFailed,
    SaveFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStage {
    Disabled,
    Dispatched(ToolCommand),
}

/// What one save event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub document: DocumentId,
    pub format: FormatStage,
    pub check: CheckStage,
}

pub struct SaveOrchestrator<S, F, C> {
    this: Weak<Self>,
    surface: Arc<S>,
    formatter: Arc<F>,
    checks: C,
    settings: watch::Receiver<EffectiveSettings>,
    tracker: SharedTracker,
    active_editor: Mutex<Option<DocumentId>>,
}

impl<S, F, C> SaveOrchestrator<S, F, C>
where
    S: EditorSurface,
    F: FormatProvider,
    C: CheckDispatcher,
{
    #[must_use]
    pub fn new(
        surface: Arc<S>,
        formatter: Arc<F>,
        checks: C,
        settings: watch::Receiver<EffectiveSettings>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            surface,
            formatter,
            checks,
            settings,
            tracker: Arc::new(Mutex::new(DocumentTracker::default())),
            active_editor: Mutex::new(None),
        })
    }

    pub fn set_active_editor(&self, document: Option<DocumentId>) {
        *self
            .active_editor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = document;
    }

    #[must_use]
    pub fn active_editor(&self) -> Option<DocumentId> {
        self.active_editor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current pipeline stage of `document`; `None` means idle.
    #[must_use]
    pub fn stage(&self, document: &DocumentId) -> Option<PipelineStage> {
        tracker::lock(&self.tracker).stage(document)
    }

    /// Number of documents currently in the pipeline.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        tracker::lock(&self.tracker).len()
    }

    /// Admit a save notification.
    ///
    /// Returns `None` for ineligible documents and for the pipeline's own
    /// re-save. Otherwise returns the pipeline for this event; the caller
    /// decides where it runs.
    pub fn on_document_saved(
        &self,
        document: &Document,
    ) -> Option<impl Future<Output = SaveOutcome> + Send + 'static + use<S, F, C>> {
        if !is_eligible(document) {
            tracing::trace!(document = %document.id(), "Save ignored: not a Rust source file");
            return None;
        }
        if tracker::lock(&self.tracker).is_synth_saving(document.id()) {
            tracing::debug!(document = %document.id(), "Save ignored: synthetic re-save");
            return None;
        }
        let this = self.this.upgrade()?;

        let settings = *self.settings.borrow();
        let in_active_editor = self.active_editor().as_ref() == Some(document.id());
        let document = document.clone();
        Some(async move { this.run(document, settings, in_active_editor).await })
    }

    async fn run(
        &self,
        document: Document,
        settings: EffectiveSettings,
        in_active_editor: bool,
    ) -> SaveOutcome {
        let format = if !settings.format_on_save {
            FormatStage::Disabled
        } else if !in_active_editor {
            FormatStage::NotActiveEditor
        } else {
            self.format_and_resave(&document).await
        };

        let check = if settings.check_on_save {
            let command = settings.check_with.command();
            self.checks.dispatch_check(command);
            CheckStage::Dispatched(command)
        } else {
            CheckStage::Disabled
        };

        tracing::debug!(
            document = %document.id(),
            format = ?format,
            check = ?check,
            "Save handled"
        );
        SaveOutcome {
            document: document.id().clone(),
            format,
            check,
        }
    }

    async fn format_and_resave(&self, document: &Document) -> FormatStage {
        let id = document.id();
        let (guard, queued) = self.enter_when_idle(id).await;
        // A queued save formats the buffer as the earlier pipeline left it.
        let current = if queued {
            self.surface.document(id)
        } else {
            None
        };
        let document = current.as_ref().unwrap_or(document);

        let edits = match self.formatter.provide_edits(document).await {
            Ok(edits) => edits,
            Err(e) => {
                tracing::debug!(document = %id, "Format on save failed: {e}");
                return FormatStage::FormatFailed;
            }
        };
        if let Err(e) = self.surface.apply_edits(id, &edits).await {
            tracing::debug!(document = %id, "Applying format edits failed: {e}");
            return FormatStage::ApplyFailed;
        }

        guard.begin_synthetic_save();
        let stage = match self.surface.save(id).await {
            Ok(()) => FormatStage::Formatted { edits: edits.len() },
            Err(e) => {
                tracing::warn!(document = %id, "Re-save after formatting failed: {e}");
                FormatStage::SaveFailed
            }
        };
        drop(guard);
        stage
    }

    /// Enter the pipeline for `id`, waiting for an earlier save of the same
    /// document to settle first. Returns whether it had to wait.
    async fn enter_when_idle(&self, id: &DocumentId) -> (PipelineGuard, bool) {
        let settled = tracker::lock(&self.tracker).settled();
        let mut queued = false;
        loop {
            let notified = settled.notified();
            if let Some(guard) = PipelineGuard::enter(&self.tracker, id.clone()) {
                return (guard, queued);
            }
            if !queued {
                tracing::debug!(document = %id, "Format queued behind an earlier save");
                queued = true;
            }
            notified.await;
        }
    }
}

impl<S, F, C> SaveListener for SaveOrchestrator<S, F, C>
where
    S: EditorSurface,
    F: FormatProvider,
    C: CheckDispatcher,
{
    fn document_saved(&self, document: &Document) -> bool {
        match self.on_document_saved(document) {
            Some(pipeline) => {
                tokio::spawn(pipeline);
                true
            }
            None => false,
        }
    }
}
