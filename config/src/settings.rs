use std::env;
use std::path::{Path, PathBuf};

use ferrule_types::CheckWith;
use serde::Deserialize;
use thiserror::Error;

const WORKSPACE_CONFIG_FILE: &str = ".ferrule.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    rust: Settings,
}

/// The user's `[rust]` settings table.
///
/// ```toml
/// [rust]
/// formatOnSave = true
/// checkOnSave = true
/// checkWith = "clippy"
/// useJsonErrors = false
/// useNewErrorFormat = false
/// rustLangSrcPath = "${HOME}/src/rust/library"
/// ```
///
/// `useJsonErrors` and `useNewErrorFormat` are mutually exclusive; this type
/// keeps both flags as written and leaves the conflict to the resolver.
/// `useNewErrorFormat` asks for rustc's rendered diagnostics, which current
/// toolchains print by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub format_on_save: bool,
    pub check_on_save: bool,
    pub check_with: CheckWith,
    pub use_json_errors: bool,
    pub use_new_error_format: bool,
    /// Library sources exported to tools as `RUST_SRC_PATH`.
    pub rust_lang_src_path: Option<String>,
    pub cargo_path: Option<String>,
    pub cargo_home_path: Option<String>,
    pub rustfmt_path: Option<String>,
    pub rustsym_path: Option<String>,
    pub racer_path: Option<String>,
}

impl Settings {
    /// Parse the contents of a config file. `path` is only used for errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str::<ConfigFile>(content)
            .map(|file| file.rust)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content, path).inspect_err(|err| {
            tracing::warn!("{err}");
        })
    }

    /// Load settings for a workspace.
    ///
    /// `<workspace>/.ferrule.toml` wins over `~/.ferrule/config.toml`. With
    /// neither present every setting takes its default.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let candidates = [Some(workspace_config_path(workspace_root)), config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading settings");
                return Self::from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// `rustLangSrcPath` with `${VAR}` references expanded, if set and non-empty.
    #[must_use]
    pub fn rust_src_path(&self) -> Option<String> {
        expand_non_empty(self.rust_lang_src_path.as_deref())
    }

    #[must_use]
    pub fn cargo_binary(&self) -> String {
        expand_non_empty(self.cargo_path.as_deref()).unwrap_or_else(|| "cargo".to_string())
    }

    #[must_use]
    pub fn cargo_home(&self) -> Option<PathBuf> {
        expand_non_empty(self.cargo_home_path.as_deref()).map(PathBuf::from)
    }

    #[must_use]
    pub fn rustfmt_binary(&self) -> String {
        expand_non_empty(self.rustfmt_path.as_deref()).unwrap_or_else(|| "rustfmt".to_string())
    }

    #[must_use]
    pub fn rustsym_binary(&self) -> String {
        expand_non_empty(self.rustsym_path.as_deref()).unwrap_or_else(|| "rustsym".to_string())
    }

    #[must_use]
    pub fn racer_binary(&self) -> String {
        expand_non_empty(self.racer_path.as_deref()).unwrap_or_else(|| "racer".to_string())
    }
}

fn expand_non_empty(value: Option<&str>) -> Option<String> {
    let expanded = expand_env_vars(value?.trim());
    if expanded.trim().is_empty() {
        None
    } else {
        Some(expanded)
    }
}

/// Replace `${VAR}` references with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &after[..close];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    out
}

/// `~/.ferrule/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ferrule").join("config.toml"))
}

#[must_use]
pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(WORKSPACE_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let settings = Settings::parse("", Path::new("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.format_on_save);
        assert_eq!(settings.check_with, CheckWith::Check);
    }

    #[test]
    fn parse_rust_table() {
        let toml = r#"
            [rust]
            formatOnSave = true
            checkOnSave = true
            checkWith = "clippy"
            useJsonErrors = true
            rustLangSrcPath = "/opt/rust/library"
        "#;
        let settings = Settings::parse(toml, Path::new("config.toml")).unwrap();
        assert!(settings.format_on_save);
        assert!(settings.check_on_save);
        assert_eq!(settings.check_with, CheckWith::Clippy);
        assert!(settings.use_json_errors);
        assert!(!settings.use_new_error_format);
        assert_eq!(settings.rust_src_path().as_deref(), Some("/opt/rust/library"));
    }

    #[test]
    fn unknown_check_with_uses_generic_check() {
        let toml = "[rust]\ncheckWith = \"miri\"\n";
        let settings = Settings::parse(toml, Path::new("config.toml")).unwrap();
        assert_eq!(settings.check_with, CheckWith::Check);
    }

    #[test]
    fn parse_error_carries_path() {
        let err = Settings::parse("[rust\n", Path::new("/tmp/bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Path::new("/tmp/bad.toml"));
    }

    #[test]
    fn tool_binaries_default_to_path_lookup() {
        let settings = Settings::default();
        assert_eq!(settings.cargo_binary(), "cargo");
        assert_eq!(settings.rustfmt_binary(), "rustfmt");
        assert_eq!(settings.racer_binary(), "racer");
        assert_eq!(settings.rustsym_binary(), "rustsym");
        assert!(settings.cargo_home().is_none());
    }

    #[test]
    fn blank_paths_count_as_unset() {
        let settings = Settings {
            rust_lang_src_path: Some("   ".to_string()),
            cargo_path: Some(String::new()),
            ..Settings::default()
        };
        assert!(settings.rust_src_path().is_none());
        assert_eq!(settings.cargo_binary(), "cargo");
    }

    #[test]
    fn load_prefers_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            workspace_config_path(dir.path()),
            "[rust]\nformatOnSave = true\n",
        )
        .unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert!(settings.format_on_save);
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("FERRULE_TEST_SRC", "/src");
        }
        assert_eq!(expand_env_vars("${FERRULE_TEST_SRC}/library"), "/src/library");
        unsafe {
            std::env::remove_var("FERRULE_TEST_SRC");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            std::env::remove_var("FERRULE_MISSING_VAR");
        }
        assert_eq!(expand_env_vars("a${FERRULE_MISSING_VAR}b"), "ab");
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("test ${UNCLOSED"), "test ${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_dropped() {
        assert_eq!(expand_env_vars("test ${} more"), "test  more");
    }
}
