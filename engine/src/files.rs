//! File-backed editing surface for hosts without their own buffers.
//!
//! Documents are read from disk when opened, edited in memory and written back
//! atomically on save. Every save is reported to the registered
//! [`SaveListener`] before `save` returns.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError, Weak};

use ferrule_types::{Document, DocumentId, TextEdit, apply_edits};
use ferrule_utils::atomic_write;

use crate::save::SaveListener;
use crate::surface::{EditorSurface, SurfaceError};

/// Language identifier for a path, from its extension.
#[must_use]
pub fn language_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("rs") => "rust",
        Some("toml") => "toml",
        Some("md") => "markdown",
        _ => "plaintext",
    }
}

#[derive(Default)]
pub struct FileSurface {
    documents: Mutex<HashMap<DocumentId, Document>>,
    listener: OnceLock<Weak<dyn SaveListener>>,
}

impl FileSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the save listener. Only the first registration takes effect.
    pub fn set_listener(&self, listener: Weak<dyn SaveListener>) -> bool {
        self.listener.set(listener).is_ok()
    }

    /// Load `path` into a buffer, replacing any buffer already open for it.
    pub fn open(&self, path: &Path) -> io::Result<Document> {
        let text = std::fs::read_to_string(path)?;
        let id = DocumentId::new(path);
        let document = Document::new(id.clone(), language_for(path), text);
        self.documents().insert(id, document.clone());
        tracing::debug!(document = %document.id(), "Opened");
        Ok(document)
    }

    /// Replace the buffer contents of an open document.
    pub fn set_text(&self, id: &DocumentId, text: impl Into<String>) -> Result<(), SurfaceError> {
        let mut documents = self.documents();
        let current = documents
            .get(id)
            .ok_or_else(|| SurfaceError::NotOpen(id.clone()))?;
        let updated = Document::new(id.clone(), current.language_id(), text);
        documents.insert(id.clone(), updated);
        Ok(())
    }

    fn documents(&self) -> std::sync::MutexGuard<'_, HashMap<DocumentId, Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_saved(&self, document: &Document) {
        if let Some(listener) = self.listener.get().and_then(Weak::upgrade) {
            let admitted = listener.document_saved(document);
            tracing::trace!(document = %document.id(), admitted, "Save notified");
        }
    }
}

impl EditorSurface for FileSurface {
    fn document(&self, id: &DocumentId) -> Option<Document> {
        self.documents().get(id).cloned()
    }

    async fn apply_edits(&self, id: &DocumentId, edits: &[TextEdit]) -> Result<(), SurfaceError> {
        let mut documents = self.documents();
        let current = documents
            .get(id)
            .ok_or_else(|| SurfaceError::NotOpen(id.clone()))?;
        let text = apply_edits(current.text(), edits).map_err(|source| SurfaceError::Edit {
            document: id.clone(),
            source,
        })?;
        let updated = Document::new(id.clone(), current.language_id(), text);
        documents.insert(id.clone(), updated);
        Ok(())
    }

    async fn save(&self, id: &DocumentId) -> Result<(), SurfaceError> {
        let document = self
            .document(id)
            .ok_or_else(|| SurfaceError::NotOpen(id.clone()))?;
        let path = id.path().to_path_buf();
        let bytes = document.text().as_bytes().to_vec();
        tokio::task::spawn_blocking(move || atomic_write(&path, &bytes))
            .await
            .map_err(io::Error::other)
            .and_then(|written| written)
            .map_err(|source| SurfaceError::Save {
                document: id.clone(),
                source,
            })?;
        tracing::debug!(document = %id, "Saved");
        self.notify_saved(&document);
        Ok(())
    }
}
