//! Document snapshots and the save-pipeline eligibility filter.

use crate::ids::DocumentId;

/// Language identifier the save pipeline reacts to.
pub const TARGET_LANGUAGE_ID: &str = "rust";

/// File suffix the save pipeline reacts to.
pub const SOURCE_EXTENSION: &str = ".rs";

/// Snapshot of an open document as handed over by the editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    language_id: String,
    text: String,
}

impl Document {
    #[must_use]
    pub fn new(id: DocumentId, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            language_id: language_id.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Whether a document participates in the save pipeline.
///
/// Both the declared language and the file suffix must match; a `.rs` file
/// opened as plain text is ignored, and so is a rust buffer with no `.rs` name.
#[must_use]
pub fn is_eligible(document: &Document) -> bool {
    document.language_id() == TARGET_LANGUAGE_ID
        && document
            .id()
            .path()
            .to_str()
            .is_some_and(|path| path.ends_with(SOURCE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, language: &str) -> Document {
        Document::new(DocumentId::new(path), language, "")
    }

    #[test]
    fn rust_source_is_eligible() {
        assert!(is_eligible(&doc("src/main.rs", "rust")));
    }

    #[test]
    fn markdown_is_not_eligible() {
        assert!(!is_eligible(&doc("README.md", "markdown")));
    }

    #[test]
    fn language_and_extension_must_both_match() {
        assert!(!is_eligible(&doc("src/main.rs", "plaintext")));
        assert!(!is_eligible(&doc("Cargo.toml", "rust")));
        assert!(!is_eligible(&doc("src/main.rs.orig", "rust")));
    }
}
