//! Per-file diagnostics of the latest compiling run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::{DiagnosticsSnapshot, ToolDiagnostic};

/// Keyed by path so snapshots come out in path order without sorting.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticsStore {
    by_file: BTreeMap<PathBuf, Vec<ToolDiagnostic>>,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace what is known about `path`. An empty list means the file is clean.
    pub fn update(&mut self, path: PathBuf, items: Vec<ToolDiagnostic>) {
        if items.is_empty() {
            self.by_file.remove(&path);
            return;
        }
        self.by_file.insert(path, items);
    }

    /// Drop everything; the next compiling run reports the full set again.
    pub fn clear(&mut self) {
        self.by_file.clear();
    }

    /// Files with at least one error come first; path order within each group.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let (mut failing, clean): (Vec<_>, Vec<_>) = self
            .by_file
            .iter()
            .map(|(path, items)| (path.clone(), items.clone()))
            .partition(|(_, items)| items.iter().any(|d| d.severity().is_error()));
        failing.extend(clean);
        DiagnosticsSnapshot::new(failing)
    }
}
