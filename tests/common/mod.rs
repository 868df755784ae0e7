//! Shared test utilities and fixtures
//!
//! A temporary workspace with fake tool binaries, and an activated extension
//! over a file-backed surface.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferrule_config::{ConflictChoice, ConflictPrompt, Settings};
use ferrule_engine::{EditorEvent, Extension, FileSurface};
use ferrule_toolchain::{DEFAULT_LOG_CAPACITY, ToolEvent, ToolOutput};
use ferrule_types::{Document, ToolCommand, ToolEnvironment};
use tempfile::TempDir;

/// File the fake cargo appends its arguments to, relative to the workspace.
pub const CARGO_LOG: &str = "cargo-invocations.log";

/// Reports one unresolved name in `src/main.rs`, in the human format.
pub const FAKE_CARGO: &str = r#"#!/bin/sh
echo "$@" >> cargo-invocations.log
echo "   Compiling demo v0.1.0"
echo 'error[E0425]: cannot find value `x` in this scope' >&2
echo ' --> src/main.rs:2:5' >&2
exit 101
"#;

/// Records its arguments, then runs until killed.
pub const SLOW_CARGO: &str = r#"#!/bin/sh
echo "$@" >> cargo-invocations.log
exec sleep 30
"#;

/// Takes a second before recording its arguments.
pub const LATE_CARGO: &str = r#"#!/bin/sh
sleep 1
echo "$@" >> cargo-invocations.log
"#;

/// Adds the missing space in `fn main(){`.
pub const FAKE_RUSTFMT: &str = "#!/bin/sh\nexec sed -e 's/(){/() {/'\n";

pub const BROKEN_RUSTFMT: &str = "#!/bin/sh\necho 'error: expected item' >&2\nexit 1\n";

pub const UNFORMATTED_MAIN: &str = "fn main(){\n    x;\n}\n";
pub const FORMATTED_MAIN: &str = "fn main() {\n    x;\n}\n";

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp workspace");
        fs::create_dir_all(dir.path().join("src")).expect("src dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, content).expect("write fixture");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).expect("read fixture")
    }

    /// Write an executable script under `bin/` and return its path as a string.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(&format!("bin/{name}"), body);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path.display().to_string()
    }

    /// Argument lines the fake cargo recorded, oldest first.
    pub fn cargo_invocations(&self) -> Vec<String> {
        fs::read_to_string(self.root().join(CARGO_LOG))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Answers prompts from a script; an exhausted script dismisses. Clones
/// share the script and the counters.
#[derive(Clone, Default)]
pub struct ScriptedPrompt {
    state: Arc<PromptState>,
}

#[derive(Default)]
struct PromptState {
    answers: Mutex<VecDeque<Option<ConflictChoice>>>,
    asked: AtomicUsize,
    opened: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answers: impl IntoIterator<Item = Option<ConflictChoice>>) -> Self {
        Self {
            state: Arc::new(PromptState {
                answers: Mutex::new(answers.into_iter().collect()),
                ..PromptState::default()
            }),
        }
    }

    pub fn asked(&self) -> usize {
        self.state.asked.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }
}

impl ConflictPrompt for ScriptedPrompt {
    async fn choose(&self, _message: &str, choices: &[ConflictChoice]) -> Option<ConflictChoice> {
        assert_eq!(choices, ConflictChoice::ALL.as_slice());
        self.state.asked.fetch_add(1, Ordering::SeqCst);
        self.state.answers.lock().unwrap().pop_front().flatten()
    }

    async fn open_settings(&self) {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub extension: Extension<FileSurface, ScriptedPrompt>,
    pub surface: Arc<FileSurface>,
    pub output: ToolOutput,
    pub prompt: ScriptedPrompt,
}

impl Harness {
    pub async fn activate(workspace: &Workspace, settings: Settings) -> Self {
        Self::activate_with_prompt(workspace, settings, ScriptedPrompt::default()).await
    }

    pub async fn activate_with_prompt(
        workspace: &Workspace,
        settings: Settings,
        prompt: ScriptedPrompt,
    ) -> Self {
        let surface = Arc::new(FileSurface::new());
        let output = ToolOutput::new(DEFAULT_LOG_CAPACITY);
        let extension = Extension::activate(
            workspace.root(),
            &settings,
            Arc::clone(&surface),
            prompt.clone(),
            ToolEnvironment::new(),
            output.sender(),
        )
        .await;
        assert!(surface.set_listener(extension.save_listener()));
        Self {
            extension,
            surface,
            output,
            prompt,
        }
    }

    /// Open `path` and make it the active editor.
    pub async fn focus(&self, path: &Path) -> Document {
        let document = self.surface.open(path).expect("open document");
        self.extension
            .handle_event(EditorEvent::ActiveEditorChanged(Some(
                document.id().clone(),
            )))
            .await;
        document
    }

    /// Collect events until `command` finishes or fails to start.
    pub async fn wait_for(&mut self, command: ToolCommand) -> Vec<ToolEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(20), self.output.next_event())
                .await
                .expect("tool run finished in time")
                .expect("event channel open");
            let done = matches!(
                &event,
                ToolEvent::Finished { command: c, .. } | ToolEvent::Failed { command: c, .. }
                    if *c == command
            );
            events.push(event);
            if done {
                return events;
            }
        }
    }
}

/// Settings that point cargo and rustfmt at scripts in `workspace`.
#[cfg(unix)]
pub fn scripted_settings(workspace: &Workspace, cargo: &str, rustfmt: &str) -> Settings {
    Settings {
        cargo_path: Some(workspace.script("cargo", cargo)),
        rustfmt_path: Some(workspace.script("rustfmt", rustfmt)),
        ..Settings::default()
    }
}
