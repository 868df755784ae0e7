//! External tool invoker: runs cargo commands and reports through [`ToolEvent`]s.
//!
//! Each run is a child process with a supervisor task. The supervisor streams
//! output lines, feeds them to a [`DiagnosticParser`] fixed to the error
//! format that was effective at spawn time, and reports diagnostics and the
//! final status when the process exits.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ferrule_types::{EffectiveSettings, ErrorFormat, ToolCommand, ToolEnvironment};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::parser::DiagnosticParser;
use crate::process::locate;
use crate::types::{OutputStream, RunId, RunStatus, ToolEvent, ToolchainConfig, ToolchainError};

const CARGO: &str = "cargo";

const LINE_CHANNEL_CAPACITY: usize = 256;

type RunningMap = Arc<Mutex<HashMap<RunId, oneshot::Sender<()>>>>;

/// Extra inputs for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    example: Option<String>,
}

impl RunRequest {
    /// Target example for the `*-example-*` commands.
    #[must_use]
    pub fn with_example(example: impl Into<String>) -> Self {
        Self {
            example: Some(example.into()),
        }
    }

    #[must_use]
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }
}

/// Starts tool-chain commands. Cheap to clone; clones share running state.
#[derive(Clone)]
pub struct ToolRunner {
    config: Arc<ToolchainConfig>,
    env: ToolEnvironment,
    settings: watch::Receiver<EffectiveSettings>,
    events: mpsc::Sender<ToolEvent>,
    running: RunningMap,
    next_id: Arc<AtomicU64>,
    detached: Arc<AtomicBool>,
}

impl ToolRunner {
    #[must_use]
    pub fn new(
        config: ToolchainConfig,
        env: ToolEnvironment,
        settings: watch::Receiver<EffectiveSettings>,
        events: mpsc::Sender<ToolEvent>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            env,
            settings,
            events,
            running: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs spawned while detached survive this process exiting. Their output
    /// goes straight to the inherited stdout and stderr, so no diagnostics are
    /// collected for them. Applies to every clone.
    pub fn set_detached(&self, detached: bool) {
        self.detached.store(detached, Ordering::Relaxed);
    }

    #[must_use]
    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    /// Spawn `command`. The returned handle can terminate the run; dropping
    /// it leaves the run going.
    ///
    /// A missing cargo binary or a failed spawn is reported once as
    /// [`ToolEvent::Failed`] and returned as an error.
    pub async fn run(
        &self,
        command: ToolCommand,
        request: RunRequest,
    ) -> Result<RunHandle, ToolchainError> {
        let error_format = self.settings.borrow().error_format;
        let args = cargo_args(command, &request, error_format)?;

        let child = match self.spawn(&args) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(command = %command.name(), "Failed to start: {err}");
                self.emit(ToolEvent::Failed {
                    command,
                    error: err.to_string(),
                })
                .await;
                return Err(err);
            }
        };

        let run = RunId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (kill_tx, kill_rx) = oneshot::channel();
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run, kill_tx);

        tracing::info!(run = %run, command = %command.name(), args = ?args, "Started");
        self.emit(ToolEvent::Started { run, command, args })
            .await;

        tokio::spawn(supervise(Supervised {
            child,
            run,
            command,
            parser: DiagnosticParser::new(error_format, self.config.workspace_root()),
            events: self.events.clone(),
            running: Arc::clone(&self.running),
            kill_rx,
        }));

        Ok(RunHandle {
            run,
            command,
            running: Arc::clone(&self.running),
        })
    }

    /// Kill every run in flight. Returns how many were signalled.
    pub fn terminate(&self) -> usize {
        let senders: Vec<_> = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let count = senders.len();
        for (run, tx) in senders {
            tracing::info!(run = %run, "Terminating");
            let _ = tx.send(());
        }
        count
    }

    #[must_use]
    pub fn running_count(&self) -> usize {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn spawn(&self, args: &[String]) -> Result<Child, ToolchainError> {
        let program = locate(CARGO, self.config.cargo())?;
        let detached = self.detached.load(Ordering::Relaxed);
        let output = || {
            if detached {
                Stdio::inherit()
            } else {
                Stdio::piped()
            }
        };
        let mut cmd = Command::new(&program);
        cmd.args(args)
            .current_dir(self.config.workspace_root())
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .kill_on_drop(!detached);
        for (key, value) in self.env.snapshot() {
            cmd.env(key, value);
        }
        if let Some(home) = self.config.cargo_home() {
            cmd.env("CARGO_HOME", home);
        }
        cmd.spawn()
            .map_err(|source| ToolchainError::Spawn { tool: CARGO, source })
    }

    async fn emit(&self, event: ToolEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Tool event receiver dropped");
        }
    }
}

/// Full cargo argument list for `command` under `error_format`.
pub(crate) fn cargo_args(
    command: ToolCommand,
    request: &RunRequest,
    error_format: ErrorFormat,
) -> Result<Vec<String>, ToolchainError> {
    let mut args = command.cargo_args(request.example())?;
    if command.compiles()
        && let Some(format) = error_format.message_format()
    {
        args.push(format!("--message-format={format}"));
    }
    Ok(args)
}

/// Handle to one run.
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    command: ToolCommand,
    running: RunningMap,
}

impl RunHandle {
    #[must_use]
    pub fn id(&self) -> RunId {
        self.run
    }

    #[must_use]
    pub fn command(&self) -> ToolCommand {
        self.command
    }

    /// Kill this run. Returns `false` if it already finished.
    pub fn terminate(&self) -> bool {
        let tx = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.run);
        match tx {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

struct Supervised {
    child: Child,
    run: RunId,
    command: ToolCommand,
    parser: DiagnosticParser,
    events: mpsc::Sender<ToolEvent>,
    running: RunningMap,
    kill_rx: oneshot::Receiver<()>,
}

async fn supervise(task: Supervised) {
    let Supervised {
        mut child,
        run,
        command,
        mut parser,
        events,
        running,
        kill_rx,
    } = task;

    let (line_tx, mut line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_lines(stdout, OutputStream::Stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_lines(stderr, OutputStream::Stderr, line_tx));
    }

    let forward_events = events.clone();
    let forwarder = tokio::spawn(async move {
        while let Some((stream, line)) = line_rx.recv().await {
            parser.feed(&line);
            let _ = forward_events
                .send(ToolEvent::Output { run, stream, line })
                .await;
        }
        parser
    });

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = kill_rx => None,
    };
    let status = match waited {
        Some(Ok(status)) if status.success() => RunStatus::Succeeded,
        Some(Ok(status)) => RunStatus::Failed(status.code()),
        Some(Err(e)) => {
            tracing::warn!(run = %run, "Failed to wait for cargo: {e}");
            RunStatus::Failed(None)
        }
        None => {
            if let Err(e) = child.kill().await {
                tracing::debug!(run = %run, "Kill after terminate failed: {e}");
            }
            RunStatus::Terminated
        }
    };

    running
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&run);

    // Orphaned grandchildren may hold the pipes open after a kill.
    let files = if status == RunStatus::Terminated {
        forwarder.abort();
        Vec::new()
    } else {
        match forwarder.await {
            Ok(parser) => parser.finish(),
            Err(e) => {
                tracing::warn!(run = %run, "Output forwarder failed: {e}");
                Vec::new()
            }
        }
    };
    for (path, items) in files {
        let _ = events
            .send(ToolEvent::Diagnostics { run, path, items })
            .await;
    }

    tracing::info!(run = %run, command = %command.name(), status = %status.label(), "Finished");
    let _ = events
        .send(ToolEvent::Finished {
            run,
            command,
            status,
        })
        .await;
}

async fn read_lines<R>(reader: R, stream: OutputStream, tx: mpsc::Sender<(OutputStream, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send((stream, line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading tool output: {e}");
                break;
            }
        }
    }
}
