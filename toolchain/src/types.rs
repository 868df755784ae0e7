//! Configuration, events and diagnostics shared with callers.
//!
//! A [`ToolchainConfig`] says where the binaries are. Runs report through
//! [`ToolEvent`]s, and compiling runs leave a [`DiagnosticsSnapshot`].

use std::fmt;
use std::path::{Path, PathBuf};

use ferrule_types::{MissingExample, ToolCommand};
use thiserror::Error;

/// Where the tool binaries live and which workspace they run in.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    workspace_root: PathBuf,
    cargo: String,
    cargo_home: Option<PathBuf>,
    rustfmt: String,
    rustsym: String,
    racer: String,
}

impl ToolchainConfig {
    /// Every tool looked up by its bare name on `PATH`.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            cargo: "cargo".to_string(),
            cargo_home: None,
            rustfmt: "rustfmt".to_string(),
            rustsym: "rustsym".to_string(),
            racer: "racer".to_string(),
        }
    }

    pub fn with_cargo(mut self, cargo: impl Into<String>) -> Self {
        self.cargo = cargo.into();
        self
    }

    pub fn with_cargo_home(mut self, cargo_home: Option<PathBuf>) -> Self {
        self.cargo_home = cargo_home;
        self
    }

    pub fn with_rustfmt(mut self, rustfmt: impl Into<String>) -> Self {
        self.rustfmt = rustfmt.into();
        self
    }

    pub fn with_rustsym(mut self, rustsym: impl Into<String>) -> Self {
        self.rustsym = rustsym.into();
        self
    }

    pub fn with_racer(mut self, racer: impl Into<String>) -> Self {
        self.racer = racer.into();
        self
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[must_use]
    pub fn cargo(&self) -> &str {
        &self.cargo
    }

    #[must_use]
    pub fn cargo_home(&self) -> Option<&Path> {
        self.cargo_home.as_deref()
    }

    #[must_use]
    pub fn rustfmt(&self) -> &str {
        &self.rustfmt
    }

    #[must_use]
    pub fn rustsym(&self) -> &str {
        &self.rustsym
    }

    #[must_use]
    pub fn racer(&self) -> &str {
        &self.racer
    }
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("{tool} not found (looked for `{binary}`): {source}")]
    NotFound {
        tool: &'static str,
        binary: String,
        source: which::Error,
    },
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error("{tool} did not finish within {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: &'static str,
        status: String,
        stderr: String,
    },
    #[error("unreadable {tool} output: {source}")]
    Output {
        tool: &'static str,
        source: serde_json::Error,
    },
    #[error("i/o error while running {tool}: {source}")]
    Io {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error(transparent)]
    MissingExample(#[from] MissingExample),
}

/// Severity level of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Note,
    Help,
}

impl DiagnosticSeverity {
    /// Parse a rustc level string (`error`, `warning`, `note`, `help`).
    ///
    /// Internal compiler errors count as errors. Anything else (for example
    /// `failure-note`) returns `None`; callers decide whether to drop it.
    #[must_use]
    pub fn from_level(level: &str) -> Option<Self> {
        match level {
            "error" | "error: internal compiler error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "note" => Some(Self::Note),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
        }
    }
}

/// One message from rustc or clippy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDiagnostic {
    severity: DiagnosticSeverity,
    message: String,
    /// 0-indexed line number.
    line: u32,
    /// 0-indexed column.
    col: u32,
    /// Diagnostic code (e.g. "E0425", "clippy::needless_return"), or "rustc".
    source: String,
}

impl ToolDiagnostic {
    #[must_use]
    pub fn new(
        severity: DiagnosticSeverity,
        message: String,
        line: u32,
        col: u32,
        source: String,
    ) -> Self {
        Self {
            severity,
            message,
            line,
            col,
            source,
        }
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 0-indexed line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 0-indexed column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Format as `path:line:col: severity: [source] message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            path.display(),
            self.line + 1,
            self.col + 1,
            self.severity.label(),
            self.source,
            self.message,
        )
    }
}

/// Identifies one invocation of [`crate::ToolRunner::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u64);

impl RunId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    /// Non-zero exit. `None` when the process was killed by a signal.
    Failed(Option<i32>),
    Terminated,
}

impl RunStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Succeeded => "succeeded".to_string(),
            Self::Failed(Some(code)) => format!("failed (exit code {code})"),
            Self::Failed(None) => "failed".to_string(),
            Self::Terminated => "terminated".to_string(),
        }
    }
}

/// An event emitted by the tool runner.
#[derive(Debug, Clone)]
pub enum ToolEvent {
    Started {
        run: RunId,
        command: ToolCommand,
        args: Vec<String>,
    },
    Output {
        run: RunId,
        stream: OutputStream,
        line: String,
    },
    /// All diagnostics a finished run reported for one file.
    Diagnostics {
        run: RunId,
        path: PathBuf,
        items: Vec<ToolDiagnostic>,
    },
    Finished {
        run: RunId,
        command: ToolCommand,
        status: RunStatus,
    },
    /// The command could not be started at all.
    Failed { command: ToolCommand, error: String },
}

/// Diagnostics of the latest compiling run, grouped by file.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    files: Vec<(PathBuf, Vec<ToolDiagnostic>)>,
}

impl DiagnosticsSnapshot {
    pub(crate) fn new(files: Vec<(PathBuf, Vec<ToolDiagnostic>)>) -> Self {
        Self { files }
    }

    /// Files that have at least one error are listed first.
    #[must_use]
    pub fn files(&self) -> &[(PathBuf, Vec<ToolDiagnostic>)] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn all(&self) -> impl Iterator<Item = &ToolDiagnostic> {
        self.files.iter().flat_map(|(_, items)| items.iter())
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.all().filter(|d| d.severity().is_error()).count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.all()
            .filter(|d| d.severity() == DiagnosticSeverity::Warning)
            .count()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.all().count()
    }

    /// `"2 errors, 1 warning"`, or empty when nothing was reported.
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        };
        format!(
            "{}, {}",
            plural(self.error_count(), "error"),
            plural(self.warning_count(), "warning")
        )
    }
}
