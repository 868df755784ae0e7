//! Language-feature adapters over the tool-chain collaborators.

use std::sync::Arc;

use ferrule_toolchain::{
    CompletionItem, CompletionSource, SymbolIndex, SymbolInformation, ToolchainError,
};
use ferrule_types::{Document, DocumentId, Position, is_eligible};
use thiserror::Error;

use crate::format::{FormatError, FormatProvider};
use crate::surface::{EditorSurface, SurfaceError};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not a Rust source file")]
    Ineligible(DocumentId),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Tool(#[from] ToolchainError),
}

/// Explicit formatting: edits go to the live buffer and the document is left
/// unsaved.
pub struct FormattingProvider<S, F> {
    surface: Arc<S>,
    formatter: Arc<F>,
}

impl<S: EditorSurface, F: FormatProvider> FormattingProvider<S, F> {
    #[must_use]
    pub fn new(surface: Arc<S>, formatter: Arc<F>) -> Self {
        Self { surface, formatter }
    }

    /// Format the open document `id`. Returns the number of edits applied.
    pub async fn format_document(&self, id: &DocumentId) -> Result<usize, ProviderError> {
        let document = self
            .surface
            .document(id)
            .ok_or_else(|| SurfaceError::NotOpen(id.clone()))?;
        if !is_eligible(&document) {
            return Err(ProviderError::Ineligible(id.clone()));
        }
        let edits = self.formatter.provide_edits(&document).await?;
        if !edits.is_empty() {
            self.surface.apply_edits(id, &edits).await?;
        }
        tracing::info!(document = %id, edits = edits.len(), "Formatted document");
        Ok(edits.len())
    }
}

pub struct SymbolProvider<I> {
    index: I,
}

impl<I: SymbolIndex> SymbolProvider<I> {
    #[must_use]
    pub fn new(index: I) -> Self {
        Self { index }
    }

    pub async fn document_symbols(
        &self,
        document: &Document,
    ) -> Result<Vec<SymbolInformation>, ProviderError> {
        if !is_eligible(document) {
            return Err(ProviderError::Ineligible(document.id().clone()));
        }
        Ok(self.index.document_symbols(document.id().path()).await?)
    }

    /// An empty query yields no symbols without running the indexer.
    pub async fn workspace_symbols(
        &self,
        query: &str,
    ) -> Result<Vec<SymbolInformation>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.index.workspace_symbols(query).await?)
    }
}

/// Completions never fail from the editor's point of view; lookup errors
/// produce an empty list and stay in the completion error log.
pub struct CompletionProvider<C> {
    source: C,
}

impl<C: CompletionSource> CompletionProvider<C> {
    #[must_use]
    pub fn new(source: C) -> Self {
        Self { source }
    }

    pub async fn complete(&self, document: &Document, position: Position) -> Vec<CompletionItem> {
        if !is_eligible(document) {
            return Vec::new();
        }
        match self.source.complete(document, position).await {
            Ok(items) => items,
            Err(e) => {
                tracing::debug!(document = %document.id(), "No completions: {e}");
                Vec::new()
            }
        }
    }
}
