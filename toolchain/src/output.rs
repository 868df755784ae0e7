//! Results surface: collects [`ToolEvent`]s into something a host can show.
//!
//! Hosts await events one at a time; each is recorded before it is handed
//! back, so the log and diagnostics never lag what the host has seen.

use std::collections::VecDeque;

use ferrule_types::ToolCommand;
use tokio::sync::mpsc;

use crate::diagnostics::DiagnosticsStore;
use crate::types::{DiagnosticsSnapshot, RunId, RunStatus, ToolEvent};

/// Channel capacity between runner tasks and the results surface.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Output lines kept for display.
pub const DEFAULT_LOG_CAPACITY: usize = 2_000;

/// What the status line shows for the most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastRun {
    Running { run: RunId, command: ToolCommand },
    Finished { command: ToolCommand, status: RunStatus },
    Failed { command: ToolCommand, error: String },
}

impl LastRun {
    #[must_use]
    pub fn status_line(&self) -> String {
        match self {
            Self::Running { command, .. } => format!("cargo {}: running", command.name()),
            Self::Finished { command, status } => {
                format!("cargo {}: {}", command.name(), status.label())
            }
            Self::Failed { command, error } => format!("cargo {}: {error}", command.name()),
        }
    }
}

pub struct ToolOutput {
    events_rx: mpsc::Receiver<ToolEvent>,
    events_tx: mpsc::Sender<ToolEvent>,
    log: VecDeque<String>,
    log_capacity: usize,
    last_run: Option<LastRun>,
    diagnostics: DiagnosticsStore,
}

impl ToolOutput {
    #[must_use]
    pub fn new(log_capacity: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events_rx,
            events_tx,
            log: VecDeque::new(),
            log_capacity: log_capacity.max(1),
            last_run: None,
            diagnostics: DiagnosticsStore::new(),
        }
    }

    /// Sender to hand to a [`crate::ToolRunner`].
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<ToolEvent> {
        self.events_tx.clone()
    }

    /// Wait for the next event, record it, and return it.
    pub async fn next_event(&mut self) -> Option<ToolEvent> {
        let event = self.events_rx.recv().await?;
        self.record(&event);
        Some(event)
    }

    /// Wait until `command` has started or failed to start, recording every
    /// event on the way. Returns the `Started` or `Failed` event.
    pub async fn wait_for_start(&mut self, command: ToolCommand) -> Option<ToolEvent> {
        while let Some(event) = self.next_event().await {
            match &event {
                ToolEvent::Started { command: started, .. }
                | ToolEvent::Failed { command: started, .. }
                    if *started == command =>
                {
                    return Some(event);
                }
                _ => {}
            }
        }
        None
    }

    fn record(&mut self, event: &ToolEvent) {
        match event {
            ToolEvent::Started { run, command, args } => {
                if command.compiles() {
                    self.diagnostics.clear();
                }
                self.push_line(format!("> cargo {}", args.join(" ")));
                self.last_run = Some(LastRun::Running {
                    run: *run,
                    command: *command,
                });
            }
            ToolEvent::Output { line, .. } => self.push_line(line.clone()),
            ToolEvent::Diagnostics { path, items, .. } => {
                tracing::debug!(
                    path = %path.display(),
                    count = items.len(),
                    "Diagnostics updated"
                );
                self.diagnostics.update(path.clone(), items.clone());
            }
            ToolEvent::Finished {
                command, status, ..
            } => {
                self.last_run = Some(LastRun::Finished {
                    command: *command,
                    status: *status,
                });
            }
            ToolEvent::Failed { command, error } => {
                self.push_line(format!("cargo {}: {error}", command.name()));
                self.last_run = Some(LastRun::Failed {
                    command: *command,
                    error: error.clone(),
                });
            }
        }
    }

    fn push_line(&mut self, line: String) {
        if self.log.len() == self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    #[must_use]
    pub fn log(&self) -> &VecDeque<String> {
        &self.log
    }

    #[must_use]
    pub fn last_run(&self) -> Option<&LastRun> {
        self.last_run.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

impl Default for ToolOutput {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
