//! ferrule CLI - drives the editor integration from a terminal.
//!
//! The binary plays the host editor: a [`FileSurface`] stands in for the
//! editor's buffers, [`TerminalPrompt`] answers settings conflicts, and a
//! [`ToolOutput`] collects tool events for printing.
//!
//! ```text
//! main() -> Settings::load -> Extension::activate -> subcommand
//!                                    |
//!                                    v
//!                     FileSurface.save -> SaveListener (echo)
//! ```

mod prompt;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ferrule_config::{Settings, config_path, workspace_config_path};
use ferrule_engine::{
    CheckStage, CommandOutcome, EditorEvent, EditorSurface, Extension, FileSurface, language_for,
};
use ferrule_toolchain::{DEFAULT_LOG_CAPACITY, ToolEvent, ToolOutput};
use ferrule_types::{
    Document, DocumentId, EditorCommand, Position, RUST_SRC_PATH, ToolCommand, ToolEnvironment,
};
use ferrule_utils::{atomic_write, compute_diff_stats, format_unified_diff};

use crate::prompt::TerminalPrompt;

type Host = Extension<FileSurface, TerminalPrompt>;

#[derive(Parser, Debug)]
#[command(name = "ferrule", version, about = "Rust tool-chain integration for editors")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, short = 'w', global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a file through the save pipeline (format on save, then check)
    Save {
        file: PathBuf,
        /// Return once the check has started; it keeps running after ferrule
        /// exits and writes its output to this terminal
        #[arg(long)]
        no_wait: bool,
    },
    /// Run a palette command such as `clippy` or `run-example-debug`
    Run {
        command: String,
        /// File shown in the active editor; selects the example for example commands
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Format a file in place
    Format {
        file: PathBuf,
        /// Print the changes as a unified diff instead of writing them
        #[arg(long)]
        diff: bool,
    },
    /// List symbols of a file, or of the workspace with --query
    Symbols {
        file: Option<PathBuf>,
        #[arg(long, short = 'q', conflicts_with = "file")]
        query: Option<String>,
    },
    /// Completions at a 1-based line and column
    Complete { file: PathBuf, line: u32, column: u32 },
    /// List palette commands
    Commands,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.ferrule/logs/ferrule.log
    if let Some(config_path) = config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("ferrule.log"));
    }

    // Fallback: ./.ferrule/logs/ferrule.log
    candidates.push(PathBuf::from(".ferrule").join("logs").join("ferrule.log"));

    candidates
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let workspace = fs::canonicalize(&workspace)
        .with_context(|| format!("workspace {} does not exist", workspace.display()))?;

    if let Commands::Commands = cli.command {
        for command in EditorCommand::all() {
            println!("{command}");
        }
        return Ok(());
    }

    let settings = Settings::load(&workspace)?;
    let settings_path = existing_settings_path(&workspace);
    let surface = Arc::new(FileSurface::new());
    let mut output = ToolOutput::new(DEFAULT_LOG_CAPACITY);
    let inherited = std::env::var(RUST_SRC_PATH).ok();
    let env = ToolEnvironment::with_vars(inherited.map(|path| (RUST_SRC_PATH, path)));
    let host: Host = Extension::activate(
        &workspace,
        &settings,
        Arc::clone(&surface),
        TerminalPrompt::new(settings_path),
        env,
        output.sender(),
    )
    .await;
    surface.set_listener(host.save_listener());

    match cli.command {
        Commands::Save { file, no_wait } => {
            save(&host, &surface, &mut output, &workspace.join(file), no_wait).await
        }
        Commands::Run { command, file } => {
            if let Some(file) = file {
                open_active(&host, &surface, &workspace.join(file)).await?;
            }
            run_command(&host, &mut output, &command).await
        }
        Commands::Format { file, diff } => format(&host, &surface, &workspace.join(file), diff).await,
        Commands::Symbols { file, query } => symbols(&host, &workspace, file, query).await,
        Commands::Complete { file, line, column } => {
            let document = surface.open(&workspace.join(&file))?;
            let position = Position::new(line.saturating_sub(1), column.saturating_sub(1));
            for item in host.completions().complete(&document, position).await {
                println!("{}\t{:?}\t{}", item.label, item.kind, item.detail);
            }
            Ok(())
        }
        Commands::Commands => Ok(()),
    }
}

/// The file that `open_settings` points the user at.
fn existing_settings_path(workspace: &Path) -> PathBuf {
    let local = workspace_config_path(workspace);
    if local.exists() {
        return local;
    }
    config_path().unwrap_or(local)
}

async fn open_active(host: &Host, surface: &FileSurface, path: &Path) -> Result<Document> {
    let document = surface
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    host.handle_event(EditorEvent::ActiveEditorChanged(Some(document.id().clone())))
        .await;
    Ok(document)
}

async fn save(
    host: &Host,
    surface: &FileSurface,
    output: &mut ToolOutput,
    path: &Path,
    no_wait: bool,
) -> Result<()> {
    if no_wait {
        host.runner().set_detached(true);
    }
    let document = open_active(host, surface, path).await?;
    let Some(pipeline) = host
        .handle_event(EditorEvent::DocumentSaved(document.clone()))
        .await
    else {
        println!("{}: not a Rust source file, nothing to do", document.id());
        return Ok(());
    };
    let outcome = pipeline.await.context("save pipeline task failed")?;
    println!("{}: format {:?}", outcome.document, outcome.format);

    match outcome.check {
        CheckStage::Disabled => Ok(()),
        CheckStage::Dispatched(command) if no_wait => match output.wait_for_start(command).await {
            Some(ToolEvent::Started { run, .. }) => {
                println!("{command} started as run {run}; not waiting for it");
                Ok(())
            }
            Some(ToolEvent::Failed { error, .. }) => bail!("{command} did not start: {error}"),
            _ => bail!("{command} was dispatched but never started"),
        },
        CheckStage::Dispatched(command) => wait_for(output, command).await,
    }
}

async fn run_command(host: &Host, output: &mut ToolOutput, name: &str) -> Result<()> {
    let command = EditorCommand::from_str(name)?;
    match host.execute(command).await? {
        CommandOutcome::Started(handle) => wait_for(output, handle.command()).await,
        CommandOutcome::Terminated(count) => {
            println!("terminated {count} run(s)");
            Ok(())
        }
        CommandOutcome::CompletionErrors(entries) => {
            if entries.is_empty() {
                println!("no completion errors");
            }
            for entry in entries {
                println!("{entry}");
            }
            Ok(())
        }
        CommandOutcome::Formatted { document, edits } => {
            println!("{document}: {edits} edit(s)");
            Ok(())
        }
    }
}

/// Print tool output until `command` finishes, then its diagnostics.
async fn wait_for(output: &mut ToolOutput, command: ToolCommand) -> Result<()> {
    while let Some(event) = output.next_event().await {
        match event {
            ToolEvent::Output { line, .. } => println!("{line}"),
            ToolEvent::Finished { command: done, .. } | ToolEvent::Failed { command: done, .. }
                if done == command =>
            {
                break;
            }
            _ => {}
        }
    }

    let snapshot = output.snapshot();
    for (path, items) in snapshot.files() {
        for item in items {
            println!("{}", item.display_with_path(path));
        }
    }
    if let Some(last) = output.last_run() {
        println!("{}", last.status_line());
    }
    if !snapshot.is_empty() {
        println!("{}", snapshot.status_string());
    }
    if snapshot.error_count() > 0 {
        bail!("{command} reported {} error(s)", snapshot.error_count());
    }
    Ok(())
}

async fn format(host: &Host, surface: &FileSurface, path: &Path, diff: bool) -> Result<()> {
    let before = open_active(host, surface, path).await?;
    match host.execute(EditorCommand::FormatDocument).await? {
        CommandOutcome::Formatted { edits: 0, document } => {
            println!("{document}: already formatted");
            return Ok(());
        }
        CommandOutcome::Formatted { .. } => {}
        other => bail!("unexpected outcome from format-document: {other:?}"),
    }
    let after = surface
        .document(before.id())
        .with_context(|| format!("{} was closed while formatting", before.id()))?;

    let (added, removed) = compute_diff_stats(before.text(), after.text());
    if diff {
        print!("{}", format_unified_diff(before.text(), after.text()));
    } else {
        atomic_write(path, after.text().as_bytes())
            .with_context(|| format!("cannot write {}", path.display()))?;
    }
    println!("{}: +{added} -{removed}", after.id());
    Ok(())
}

async fn symbols(
    host: &Host,
    workspace: &Path,
    file: Option<PathBuf>,
    query: Option<String>,
) -> Result<()> {
    let found = match (file, query) {
        (Some(file), _) => {
            let path = workspace.join(file);
            let text = fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let document = Document::new(
                DocumentId::new(&path),
                language_for(&path),
                text,
            );
            host.symbols().document_symbols(&document).await?
        }
        (None, Some(query)) => host.symbols().workspace_symbols(&query).await?,
        (None, None) => bail!("pass a file or --query"),
    };
    for symbol in found {
        let name = match &symbol.container {
            Some(container) => format!("{container}::{}", symbol.name),
            None => symbol.name.clone(),
        };
        println!(
            "{}\t{name}\t{}:{}:{}",
            symbol.kind.label(),
            symbol.path.display(),
            symbol.line + 1,
            symbol.column + 1
        );
    }
    Ok(())
}
