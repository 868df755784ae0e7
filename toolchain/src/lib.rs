//! Tool-chain invocation for ferrule.
//!
//! [`ToolRunner`] runs cargo commands in the background and reports through
//! [`ToolEvent`]s, which [`ToolOutput`] turns into a log, a status and a
//! diagnostics snapshot. The one-shot collaborators (rustfmt, rustsym, racer)
//! sit behind the [`SourceFormatter`], [`SymbolIndex`] and [`CompletionSource`]
//! traits.

pub mod types;

pub(crate) mod diagnostics;
pub(crate) mod process;

mod output;
mod parser;
mod racer;
mod runner;
mod rustfmt;
mod rustsym;

pub use output::{DEFAULT_LOG_CAPACITY, EVENT_CHANNEL_CAPACITY, LastRun, ToolOutput};
pub use parser::DiagnosticParser;
pub use racer::{
    CompletionErrorLog, CompletionItem, CompletionKind, CompletionSource, ERROR_LOG_CAPACITY, Racer,
};
pub use runner::{RunHandle, RunRequest, ToolRunner};
pub use rustfmt::{Rustfmt, SourceFormatter};
pub use rustsym::{Rustsym, SymbolIndex, SymbolInformation, SymbolKind};
pub use types::{
    DiagnosticSeverity, DiagnosticsSnapshot, OutputStream, RunId, RunStatus, ToolDiagnostic,
    ToolEvent, ToolchainConfig, ToolchainError,
};
