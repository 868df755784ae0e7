//! The editing surface: whatever owns open documents and their buffers.

use std::future::Future;

use ferrule_types::{Document, DocumentId, EditError, TextEdit};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("{0} is not open")]
    NotOpen(DocumentId),
    #[error("cannot apply edits to {document}: {source}")]
    Edit {
        document: DocumentId,
        source: EditError,
    },
    #[error("failed to save {document}: {source}")]
    Save {
        document: DocumentId,
        source: std::io::Error,
    },
}

/// Operations ferrule requests from the editor.
///
/// `save` must deliver the resulting save notification (see
/// [`crate::SaveListener`]) before its future resolves. The save pipeline
/// relies on this to recognise its own re-save.
pub trait EditorSurface: Send + Sync + 'static {
    /// Current contents of an open document.
    fn document(&self, id: &DocumentId) -> Option<Document>;

    /// Apply `edits` to the live buffer of `id`.
    fn apply_edits(
        &self,
        id: &DocumentId,
        edits: &[TextEdit],
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Persist the buffer of `id`.
    fn save(&self, id: &DocumentId) -> impl Future<Output = Result<(), SurfaceError>> + Send;
}
