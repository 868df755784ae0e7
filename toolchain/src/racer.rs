//! racer wrapper: completions at a cursor position.
//!
//! The unsaved buffer is written to a substitute file so racer sees the
//! current text rather than what is on disk.

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

use ferrule_types::{Document, Position, ToolEnvironment};
use regex::Regex;
use tempfile::NamedTempFile;

use crate::process::Invocation;
use crate::types::{ToolchainConfig, ToolchainError};

const RACER: &str = "racer";

const COMPLETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Entries kept by [`CompletionErrorLog`].
pub const ERROR_LOG_CAPACITY: usize = 50;

/// `MATCH name,line,col,path,kind,context`
static MATCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MATCH ([^,]+),(\d+),(\d+),(.+?),(\w+),(.*)$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Function,
    Struct,
    Enum,
    EnumVariant,
    Trait,
    Type,
    Module,
    Crate,
    Const,
    Static,
    Macro,
    Field,
    Variable,
    Builtin,
    Other,
}

impl CompletionKind {
    fn from_match_type(kind: &str) -> Self {
        match kind {
            "Function" | "Method" => Self::Function,
            "Struct" => Self::Struct,
            "Enum" => Self::Enum,
            "EnumVariant" => Self::EnumVariant,
            "Trait" => Self::Trait,
            "Type" | "TypeParameter" | "AssocType" => Self::Type,
            "Module" => Self::Module,
            "Crate" => Self::Crate,
            "Const" => Self::Const,
            "Static" => Self::Static,
            "Macro" => Self::Macro,
            "StructField" | "Field" => Self::Field,
            "Let" | "IfLet" | "WhileLet" | "For" | "MatchArm" | "FnArg" => Self::Variable,
            "Builtin" => Self::Builtin,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// The definition line racer matched, e.g. `pub fn len(&self) -> usize`.
    pub detail: String,
    pub path: PathBuf,
    /// 0-indexed.
    pub line: u32,
    pub column: u32,
}

/// Bounded record of racer failures and stderr, newest last.
#[derive(Debug, Clone, Default)]
pub struct CompletionErrorLog {
    entries: Arc<Mutex<VecDeque<String>>>,
}

impl CompletionErrorLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == ERROR_LOG_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Completion lookup.
pub trait CompletionSource: Send + Sync {
    fn complete(
        &self,
        document: &Document,
        position: Position,
    ) -> impl Future<Output = Result<Vec<CompletionItem>, ToolchainError>> + Send;
}

#[derive(Debug, Clone)]
pub struct Racer {
    binary: String,
    workspace_root: PathBuf,
    env: ToolEnvironment,
    errors: CompletionErrorLog,
}

impl Racer {
    #[must_use]
    pub fn new(config: &ToolchainConfig, env: ToolEnvironment, errors: CompletionErrorLog) -> Self {
        Self {
            binary: config.racer().to_string(),
            workspace_root: config.workspace_root().to_path_buf(),
            env,
            errors,
        }
    }

    #[must_use]
    pub fn errors(&self) -> &CompletionErrorLog {
        &self.errors
    }

    async fn run(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<CompletionItem>, ToolchainError> {
        let mut substitute = NamedTempFile::new()
            .map_err(|source| ToolchainError::Io { tool: RACER, source })?;
        substitute
            .write_all(document.text().as_bytes())
            .and_then(|()| substitute.flush())
            .map_err(|source| ToolchainError::Io { tool: RACER, source })?;

        let output = Invocation {
            tool: RACER,
            binary: &self.binary,
            args: complete_args(document.id().path(), substitute.path(), position),
            cwd: &self.workspace_root,
            env: &self.env,
            stdin: None,
            timeout: COMPLETE_TIMEOUT,
        }
        .run()
        .await?
        .check(RACER)?;

        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            self.errors.record(stderr);
        }
        Ok(parse_matches(&output.stdout))
    }
}

impl CompletionSource for Racer {
    async fn complete(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<CompletionItem>, ToolchainError> {
        let result = self.run(document, position).await;
        if let Err(err) = &result {
            tracing::debug!(document = %document.id(), "racer failed: {err}");
            self.errors.record(err.to_string());
        }
        result
    }
}

/// racer lines are 1-based, columns 0-based.
fn complete_args(file: &Path, substitute: &Path, position: Position) -> Vec<String> {
    vec![
        "complete".to_string(),
        (position.line + 1).to_string(),
        position.character.to_string(),
        file.display().to_string(),
        substitute.display().to_string(),
    ]
}

pub(crate) fn parse_matches(stdout: &str) -> Vec<CompletionItem> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = MATCH_LINE.captures(line.trim_end())?;
            let line_no: u32 = caps[2].parse().ok()?;
            let column: u32 = caps[3].parse().ok()?;
            Some(CompletionItem {
                label: caps[1].to_string(),
                line: line_no.saturating_sub(1),
                column,
                path: PathBuf::from(&caps[4]),
                kind: CompletionKind::from_match_type(&caps[5]),
                detail: caps[6].to_string(),
            })
        })
        .collect()
}
