//! Turn cargo output into per-file diagnostics.
//!
//! The parser is fed every output line of a run, in order, and understands
//! exactly one [`ErrorFormat`]: the one that was effective when the run
//! started.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ferrule_types::ErrorFormat;
use regex::Regex;
use serde::Deserialize;

use crate::types::{DiagnosticSeverity, ToolDiagnostic};

/// `error[E0425]: cannot find value `x` in this scope`
static HUMAN_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(error|warning|note|help)(?:\[([^\]]+)\])?: (.+)$").expect("valid regex")
});

/// `  --> src/main.rs:2:5`
static HUMAN_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--> (.+):(\d+):(\d+)$").expect("valid regex"));

const DEFAULT_SOURCE: &str = "rustc";

/// One line of `--message-format=json` output.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLine {
    Cargo {
        reason: String,
        message: Option<RustcMessage>,
    },
    Rustc(RustcMessage),
}

#[derive(Deserialize)]
struct RustcMessage {
    message: String,
    level: String,
    code: Option<RustcCode>,
    #[serde(default)]
    spans: Vec<RustcSpan>,
}

#[derive(Deserialize)]
struct RustcCode {
    code: String,
}

#[derive(Deserialize)]
struct RustcSpan {
    file_name: String,
    line_start: u32,
    column_start: u32,
    is_primary: bool,
}

impl RustcMessage {
    fn into_diagnostic(self) -> Option<(String, ToolDiagnostic)> {
        let severity = DiagnosticSeverity::from_level(&self.level)?;
        let span = self.spans.into_iter().find(|span| span.is_primary)?;
        let source = self
            .code
            .map_or_else(|| DEFAULT_SOURCE.to_string(), |code| code.code);
        Some((
            span.file_name,
            ToolDiagnostic::new(
                severity,
                self.message,
                span.line_start.saturating_sub(1),
                span.column_start.saturating_sub(1),
                source,
            ),
        ))
    }
}

struct PendingHeader {
    severity: DiagnosticSeverity,
    source: String,
    message: String,
}

/// Stateful line parser for a single run.
pub struct DiagnosticParser {
    format: ErrorFormat,
    workspace_root: PathBuf,
    pending: Option<PendingHeader>,
    files: BTreeMap<PathBuf, Vec<ToolDiagnostic>>,
}

impl DiagnosticParser {
    /// Relative paths in tool output are resolved against `workspace_root`.
    #[must_use]
    pub fn new(format: ErrorFormat, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            format,
            workspace_root: workspace_root.into(),
            pending: None,
            files: BTreeMap::new(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        let line = line.trim_end();
        match self.format {
            ErrorFormat::Json => {
                if let Some((file, diag)) = parse_json_line(line) {
                    self.push(&file, diag);
                }
            }
            ErrorFormat::Human => self.feed_human(line),
        }
    }

    /// Diagnostics grouped by file, in path order.
    #[must_use]
    pub fn finish(self) -> Vec<(PathBuf, Vec<ToolDiagnostic>)> {
        self.files.into_iter().collect()
    }

    fn feed_human(&mut self, line: &str) {
        if let Some(caps) = HUMAN_HEADER.captures(line) {
            let Some(severity) = DiagnosticSeverity::from_level(&caps[1]) else {
                return;
            };
            self.pending = Some(PendingHeader {
                severity,
                source: caps
                    .get(2)
                    .map_or(DEFAULT_SOURCE, |code| code.as_str())
                    .to_string(),
                message: caps[3].to_string(),
            });
            return;
        }

        let Some(caps) = HUMAN_LOCATION.captures(line) else {
            return;
        };
        let Some(header) = self.pending.take() else {
            return;
        };
        let (Ok(line_no), Ok(col)) = (caps[2].parse::<u32>(), caps[3].parse::<u32>()) else {
            return;
        };
        let file = caps[1].to_string();
        self.push(
            &file,
            ToolDiagnostic::new(
                header.severity,
                header.message,
                line_no.saturating_sub(1),
                col.saturating_sub(1),
                header.source,
            ),
        );
    }

    fn push(&mut self, file: &str, diag: ToolDiagnostic) {
        let path = Path::new(file);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        // Cargo repeats diagnostics when several targets share a file.
        let items = self.files.entry(path).or_default();
        if !items.contains(&diag) {
            items.push(diag);
        }
    }
}

fn parse_json_line(line: &str) -> Option<(String, ToolDiagnostic)> {
    let line = line.trim_start();
    if !line.starts_with('{') {
        return None;
    }
    let message = match serde_json::from_str::<JsonLine>(line).ok()? {
        JsonLine::Cargo { reason, message } => {
            if reason != "compiler-message" {
                return None;
            }
            message?
        }
        JsonLine::Rustc(message) => message,
    };
    message.into_diagnostic()
}
