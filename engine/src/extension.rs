//! Activation and dispatch: wires every component together and routes editor
//! events and palette commands to them.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};

use ferrule_config::{ConfigurationResolver, ConflictPrompt, Settings};
use ferrule_toolchain::{
    CompletionErrorLog, Racer, RunHandle, RunRequest, Rustfmt, Rustsym, ToolEvent, ToolRunner,
    ToolchainConfig, ToolchainError,
};
use ferrule_types::{Document, DocumentId, EditorCommand, EffectiveSettings, ToolEnvironment};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::format::FormatCoordinator;
use crate::providers::{CompletionProvider, FormattingProvider, ProviderError, SymbolProvider};
use crate::save::{SaveListener, SaveOrchestrator, SaveOutcome};
use crate::surface::EditorSurface;

type Formatter = FormatCoordinator<Rustfmt>;

/// Save orchestrator as wired by [`Extension::activate`].
pub type Orchestrator<S> = SaveOrchestrator<S, Formatter, ToolRunner>;

/// Notifications from the host editor.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    DocumentSaved(Document),
    ActiveEditorChanged(Option<DocumentId>),
    ConfigurationChanged(Settings),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Tool(#[from] ToolchainError),
    #[error("no document is active")]
    NoActiveDocument,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug)]
pub enum CommandOutcome {
    Started(RunHandle),
    /// Number of runs signalled.
    Terminated(usize),
    CompletionErrors(Vec<String>),
    Formatted { document: DocumentId, edits: usize },
}

pub struct Extension<S: EditorSurface, P> {
    resolver: ConfigurationResolver,
    prompt: P,
    runner: ToolRunner,
    orchestrator: Arc<Orchestrator<S>>,
    formatting: FormattingProvider<S, Formatter>,
    symbols: SymbolProvider<Rustsym>,
    completions: CompletionProvider<Racer>,
    completion_errors: CompletionErrorLog,
}

impl<S: EditorSurface, P: ConflictPrompt> Extension<S, P> {
    /// Resolve `settings` once and build every component.
    ///
    /// Tool paths are read here; later configuration changes update the
    /// effective settings and the tool environment but not the binaries.
    pub async fn activate(
        workspace_root: impl Into<PathBuf>,
        settings: &Settings,
        surface: Arc<S>,
        prompt: P,
        env: ToolEnvironment,
        events: mpsc::Sender<ToolEvent>,
    ) -> Self {
        let resolver = ConfigurationResolver::new(env.clone());
        resolver.resolve(settings, &prompt).await;

        let config = toolchain_config(workspace_root.into(), settings);
        let formatter = Arc::new(FormatCoordinator::new(Rustfmt::new(&config, env.clone())));
        let completion_errors = CompletionErrorLog::new();
        let symbols = SymbolProvider::new(Rustsym::new(&config, env.clone()));
        let completions = CompletionProvider::new(Racer::new(
            &config,
            env.clone(),
            completion_errors.clone(),
        ));
        let runner = ToolRunner::new(config, env, resolver.subscribe(), events);
        let orchestrator = SaveOrchestrator::new(
            Arc::clone(&surface),
            Arc::clone(&formatter),
            runner.clone(),
            resolver.subscribe(),
        );
        let formatting = FormattingProvider::new(surface, formatter);

        tracing::info!(
            workspace = %runner.config().workspace_root().display(),
            "Activated"
        );
        Self {
            resolver,
            prompt,
            runner,
            orchestrator,
            formatting,
            symbols,
            completions,
            completion_errors,
        }
    }

    /// Route one editor event.
    ///
    /// An admitted save returns the handle of its pipeline task; everything
    /// else completes before returning.
    pub async fn handle_event(&self, event: EditorEvent) -> Option<JoinHandle<SaveOutcome>> {
        match event {
            EditorEvent::DocumentSaved(document) => self
                .orchestrator
                .on_document_saved(&document)
                .map(tokio::spawn),
            EditorEvent::ActiveEditorChanged(document) => {
                tracing::trace!(document = ?document, "Active editor changed");
                self.orchestrator.set_active_editor(document);
                None
            }
            EditorEvent::ConfigurationChanged(settings) => {
                self.resolver.resolve(&settings, &self.prompt).await;
                None
            }
        }
    }

    /// Run a palette command.
    pub async fn execute(&self, command: EditorCommand) -> Result<CommandOutcome, CommandError> {
        tracing::debug!(command = %command, "Executing");
        match command {
            EditorCommand::Tool(tool) => {
                let request = if tool.needs_example() {
                    self.orchestrator
                        .active_editor()
                        .and_then(|id| example_name(id.path()))
                        .map(RunRequest::with_example)
                        .unwrap_or_default()
                } else {
                    RunRequest::default()
                };
                let handle = self.runner.run(tool, request).await?;
                Ok(CommandOutcome::Started(handle))
            }
            EditorCommand::Terminate => Ok(CommandOutcome::Terminated(self.runner.terminate())),
            EditorCommand::ShowCompletionErrors => Ok(CommandOutcome::CompletionErrors(
                self.completion_errors.entries(),
            )),
            EditorCommand::FormatDocument => {
                let document = self
                    .orchestrator
                    .active_editor()
                    .ok_or(CommandError::NoActiveDocument)?;
                let edits = self.formatting.format_document(&document).await?;
                Ok(CommandOutcome::Formatted { document, edits })
            }
        }
    }

    /// Listener the host's surface notifies after every save it performs.
    #[must_use]
    pub fn save_listener(&self) -> Weak<dyn SaveListener> {
        let listener: Weak<Orchestrator<S>> = Arc::downgrade(&self.orchestrator);
        listener
    }

    #[must_use]
    pub fn settings(&self) -> EffectiveSettings {
        self.resolver.current()
    }

    #[must_use]
    pub fn environment(&self) -> &ToolEnvironment {
        self.resolver.environment()
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<S> {
        &self.orchestrator
    }

    #[must_use]
    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolProvider<Rustsym> {
        &self.symbols
    }

    #[must_use]
    pub fn completions(&self) -> &CompletionProvider<Racer> {
        &self.completions
    }
}

fn toolchain_config(workspace_root: PathBuf, settings: &Settings) -> ToolchainConfig {
    ToolchainConfig::new(workspace_root)
        .with_cargo(settings.cargo_binary())
        .with_cargo_home(settings.cargo_home())
        .with_rustfmt(settings.rustfmt_binary())
        .with_rustsym(settings.rustsym_binary())
        .with_racer(settings.racer_binary())
}

/// Example target for a file under an `examples/` directory:
/// `examples/demo.rs` and `examples/demo/main.rs` both give `demo`.
fn example_name(path: &Path) -> Option<String> {
    let mut components = path.components();
    components.find(|c| *c == Component::Normal("examples".as_ref()))?;
    let target = Path::new(components.next()?.as_os_str());
    let is_file = components.next().is_none();
    let name = if is_file {
        if target.extension()? != "rs" {
            return None;
        }
        target.file_stem()?
    } else {
        target.as_os_str()
    };
    name.to_str().map(str::to_string)
}
