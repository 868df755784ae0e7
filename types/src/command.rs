//! Invocable commands.
//!
//! Every command the editor can run is a variant here; names are parsed once
//! at the boundary and dispatch works on the enum.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Debug,
    Release,
}

impl Profile {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

/// A tool-chain invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCommand {
    Build(Profile),
    BuildExample(Profile),
    Run(Profile),
    RunExample(Profile),
    Test(Profile),
    Bench,
    Doc,
    Update,
    Clean,
    Check,
    CheckLib,
    Clippy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command} needs an example name; open a file under examples/ first")]
pub struct MissingExample {
    pub command: ToolCommand,
}

impl ToolCommand {
    pub const ALL: [Self; 17] = [
        Self::Build(Profile::Debug),
        Self::Build(Profile::Release),
        Self::BuildExample(Profile::Debug),
        Self::BuildExample(Profile::Release),
        Self::Run(Profile::Debug),
        Self::Run(Profile::Release),
        Self::RunExample(Profile::Debug),
        Self::RunExample(Profile::Release),
        Self::Test(Profile::Debug),
        Self::Test(Profile::Release),
        Self::Bench,
        Self::Doc,
        Self::Update,
        Self::Clean,
        Self::Check,
        Self::CheckLib,
        Self::Clippy,
    ];

    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Build(p) => format!("build-{}", p.suffix()),
            Self::BuildExample(p) => format!("build-example-{}", p.suffix()),
            Self::Run(p) => format!("run-{}", p.suffix()),
            Self::RunExample(p) => format!("run-example-{}", p.suffix()),
            Self::Test(p) => format!("test-{}", p.suffix()),
            Self::Bench => "bench".to_string(),
            Self::Doc => "doc".to_string(),
            Self::Update => "update".to_string(),
            Self::Clean => "clean".to_string(),
            Self::Check => "check".to_string(),
            Self::CheckLib => "check-lib".to_string(),
            Self::Clippy => "clippy".to_string(),
        }
    }

    #[must_use]
    pub const fn needs_example(self) -> bool {
        matches!(self, Self::BuildExample(_) | Self::RunExample(_))
    }

    /// Whether the command compiles code and so honours `--message-format`.
    #[must_use]
    pub const fn compiles(self) -> bool {
        !matches!(self, Self::Update | Self::Clean)
    }

    /// Cargo arguments, without error-format flags.
    pub fn cargo_args(self, example: Option<&str>) -> Result<Vec<String>, MissingExample> {
        let example = if self.needs_example() {
            match example.map(str::trim).filter(|name| !name.is_empty()) {
                Some(name) => Some(name),
                None => return Err(MissingExample { command: self }),
            }
        } else {
            None
        };

        let (subcommand, profile) = match self {
            Self::Build(p) | Self::BuildExample(p) => ("build", Some(p)),
            Self::Run(p) | Self::RunExample(p) => ("run", Some(p)),
            Self::Test(p) => ("test", Some(p)),
            Self::Bench => ("bench", None),
            Self::Doc => ("doc", None),
            Self::Update => ("update", None),
            Self::Clean => ("clean", None),
            Self::Check | Self::CheckLib => ("check", None),
            Self::Clippy => ("clippy", None),
        };

        let mut args = vec![subcommand.to_string()];
        if let Some(name) = example {
            args.push("--example".to_string());
            args.push(name.to_string());
        }
        if self == Self::CheckLib {
            args.push("--lib".to_string());
        }
        if profile == Some(Profile::Release) {
            args.push("--release".to_string());
        }
        Ok(args)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Anything the command palette can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCommand {
    Tool(ToolCommand),
    /// Stop every running tool invocation.
    Terminate,
    /// Show errors reported by the completion engine.
    ShowCompletionErrors,
    /// Format the active document in place.
    FormatDocument,
}

impl EditorCommand {
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Tool(command) => command.name(),
            Self::Terminate => "terminate".to_string(),
            Self::ShowCompletionErrors => "show-completion-errors".to_string(),
            Self::FormatDocument => "format-document".to_string(),
        }
    }

    /// Every command, in palette order.
    pub fn all() -> impl Iterator<Item = Self> {
        ToolCommand::ALL.into_iter().map(Self::Tool).chain([
            Self::Terminate,
            Self::ShowCompletionErrors,
            Self::FormatDocument,
        ])
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for EditorCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::all()
            .find(|command| command.name() == name)
            .ok_or_else(|| UnknownCommand(name.to_string()))
    }
}
