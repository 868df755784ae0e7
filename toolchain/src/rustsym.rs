//! rustsym wrapper: document and workspace symbol search.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ferrule_types::ToolEnvironment;
use serde::Deserialize;

use crate::process::Invocation;
use crate::types::{ToolchainConfig, ToolchainError};

const RUSTSYM: &str = "rustsym";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Enum,
    Variant,
    Trait,
    Impl,
    Module,
    Constant,
    Static,
    TypeAlias,
    Macro,
    Field,
    Other,
}

impl SymbolKind {
    fn from_rustsym(kind: &str) -> Self {
        match kind {
            "fn" | "function" => Self::Function,
            "method" => Self::Method,
            "struct" => Self::Struct,
            "enum" => Self::Enum,
            "variant" => Self::Variant,
            "trait" => Self::Trait,
            "impl" => Self::Impl,
            "mod" | "module" => Self::Module,
            "const" => Self::Constant,
            "static" => Self::Static,
            "type" => Self::TypeAlias,
            "macro" => Self::Macro,
            "field" => Self::Field,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Function => "fn",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Variant => "variant",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Module => "mod",
            Self::Constant => "const",
            Self::Static => "static",
            Self::TypeAlias => "type",
            Self::Macro => "macro",
            Self::Field => "field",
            Self::Other => "symbol",
        }
    }
}

/// A symbol and where it is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInformation {
    pub name: String,
    pub container: Option<String>,
    pub kind: SymbolKind,
    pub path: PathBuf,
    /// 0-indexed.
    pub line: u32,
    /// 0-indexed.
    pub column: u32,
}

#[derive(Deserialize)]
struct RawSymbol {
    name: String,
    #[serde(default)]
    container: Option<String>,
    kind: String,
    path: String,
    line: u32,
    col: u32,
}

/// Symbol lookup.
pub trait SymbolIndex: Send + Sync {
    fn document_symbols(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<SymbolInformation>, ToolchainError>> + Send;

    fn workspace_symbols(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SymbolInformation>, ToolchainError>> + Send;
}

#[derive(Debug, Clone)]
pub struct Rustsym {
    binary: String,
    workspace_root: PathBuf,
    env: ToolEnvironment,
}

impl Rustsym {
    #[must_use]
    pub fn new(config: &ToolchainConfig, env: ToolEnvironment) -> Self {
        Self {
            binary: config.rustsym().to_string(),
            workspace_root: config.workspace_root().to_path_buf(),
            env,
        }
    }

    async fn search(&self, args: Vec<String>) -> Result<Vec<SymbolInformation>, ToolchainError> {
        let output = Invocation {
            tool: RUSTSYM,
            binary: &self.binary,
            args,
            cwd: &self.workspace_root,
            env: &self.env,
            stdin: None,
            timeout: SEARCH_TIMEOUT,
        }
        .run()
        .await?
        .check(RUSTSYM)?;
        parse_symbols(&output.stdout, &self.workspace_root)
    }
}

impl SymbolIndex for Rustsym {
    async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInformation>, ToolchainError> {
        self.search(vec![
            "search".to_string(),
            "-l".to_string(),
            path.display().to_string(),
        ])
        .await
    }

    async fn workspace_symbols(&self, query: &str) -> Result<Vec<SymbolInformation>, ToolchainError> {
        self.search(vec![
            "search".to_string(),
            "-g".to_string(),
            self.workspace_root.display().to_string(),
            query.to_string(),
        ])
        .await
    }
}

/// Parse rustsym's JSON array. Empty output means no symbols.
pub(crate) fn parse_symbols(
    stdout: &str,
    workspace_root: &Path,
) -> Result<Vec<SymbolInformation>, ToolchainError> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<RawSymbol> = serde_json::from_str(stdout).map_err(|source| {
        ToolchainError::Output {
            tool: RUSTSYM,
            source,
        }
    })?;
    Ok(raw
        .into_iter()
        .map(|symbol| {
            let path = Path::new(&symbol.path);
            SymbolInformation {
                kind: SymbolKind::from_rustsym(&symbol.kind),
                container: symbol.container.filter(|c| !c.is_empty()),
                path: if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    workspace_root.join(path)
                },
                line: symbol.line.saturating_sub(1),
                column: symbol.col.saturating_sub(1),
                name: symbol.name,
            }
        })
        .collect())
}
