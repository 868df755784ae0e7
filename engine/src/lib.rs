//! Editor-facing engine for ferrule.
//!
//! [`Extension`] is the entry point: it resolves settings, owns the tool
//! runner and the save pipeline, and routes [`EditorEvent`]s and palette
//! commands. The host editor plugs in through [`EditorSurface`] and
//! [`ConflictPrompt`](ferrule_config::ConflictPrompt).

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod extension;
mod files;
mod format;
mod providers;
mod save;
mod surface;
mod tracker;

pub use extension::{CommandError, CommandOutcome, EditorEvent, Extension, Orchestrator};
pub use files::{FileSurface, language_for};
pub use format::{FormatCoordinator, FormatError, FormatProvider};
pub use providers::{CompletionProvider, FormattingProvider, ProviderError, SymbolProvider};
pub use save::{
    CheckDispatcher, CheckStage, FormatStage, SaveListener, SaveOrchestrator, SaveOutcome,
};
pub use surface::{EditorSurface, SurfaceError};
pub use tracker::{DocumentTracker, PipelineStage};
