//! Format Coordinator: one document in, text edits out.

use std::future::Future;

use ferrule_toolchain::{SourceFormatter, ToolchainError};
use ferrule_types::{Document, TextEdit};
use ferrule_utils::text_edits;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("formatter failed: {0}")]
    Formatter(#[from] ToolchainError),
}

/// Anything that can turn a document into formatting edits.
pub trait FormatProvider: Send + Sync + 'static {
    fn provide_edits(
        &self,
        document: &Document,
    ) -> impl Future<Output = Result<Vec<TextEdit>, FormatError>> + Send;
}

/// Runs a [`SourceFormatter`] and diffs its output against the document.
///
/// Holds no per-request state; concurrent requests are independent.
#[derive(Debug, Clone)]
pub struct FormatCoordinator<F> {
    formatter: F,
}

impl<F: SourceFormatter> FormatCoordinator<F> {
    #[must_use]
    pub fn new(formatter: F) -> Self {
        Self { formatter }
    }
}

impl<F: SourceFormatter + 'static> FormatProvider for FormatCoordinator<F> {
    async fn provide_edits(&self, document: &Document) -> Result<Vec<TextEdit>, FormatError> {
        let formatted = self
            .formatter
            .format(document.text(), document.id().path())
            .await?;
        let edits = text_edits(document.text(), &formatted);
        tracing::debug!(document = %document.id(), edits = edits.len(), "Computed formatting edits");
        Ok(edits)
    }
}
