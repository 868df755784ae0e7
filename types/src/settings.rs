//! Resolved configuration types shared across crates.
//!
//! Raw TOML deserialization (with its pair of conflicting error-format flags)
//! stays in `ferrule-config`. The resolver collapses it into
//! [`EffectiveSettings`], where the error format is a single value.

use serde::Deserialize;

use crate::command::{Profile, ToolCommand};

/// Which tool-chain command runs after a save.
///
/// Deserializes from the raw `checkWith` string. Unknown values fall back to
/// [`CheckWith::Check`], so every configuration maps to a runnable command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum CheckWith {
    #[default]
    Check,
    Clippy,
    Build,
    CheckLib,
    Test,
}

impl CheckWith {
    /// Total mapping from the setting to the command it dispatches.
    #[must_use]
    pub const fn command(self) -> ToolCommand {
        match self {
            Self::Check => ToolCommand::Check,
            Self::Clippy => ToolCommand::Clippy,
            Self::Build => ToolCommand::Build(Profile::Debug),
            Self::CheckLib => ToolCommand::CheckLib,
            Self::Test => ToolCommand::Test(Profile::Debug),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "default",
            Self::Clippy => "clippy",
            Self::Build => "build",
            Self::CheckLib => "check-lib",
            Self::Test => "test",
        }
    }
}

impl From<String> for CheckWith {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clippy" => Self::Clippy,
            "build" => Self::Build,
            "check-lib" => Self::CheckLib,
            "test" => Self::Test,
            _ => Self::Check,
        }
    }
}

/// Output format requested from cargo and expected by the diagnostics parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorFormat {
    /// rustc's rendered output (`error[E0425]: ...` followed by `--> file:line:col`).
    #[default]
    Human,
    /// Machine-readable JSON messages, one per line.
    Json,
}

impl ErrorFormat {
    /// Value for cargo's `--message-format`, if the format needs one.
    #[must_use]
    pub const fn message_format(self) -> Option<&'static str> {
        match self {
            Self::Human => None,
            Self::Json => Some("json"),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

/// Conflict-resolved settings consumed by the save pipeline and tool runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectiveSettings {
    pub format_on_save: bool,
    pub check_on_save: bool,
    pub check_with: CheckWith,
    pub error_format: ErrorFormat,
}
