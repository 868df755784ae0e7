//! rustfmt wrapper.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use ferrule_types::ToolEnvironment;

use crate::process::Invocation;
use crate::types::{ToolchainConfig, ToolchainError};

const RUSTFMT: &str = "rustfmt";

const FORMAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces the formatted text of a source file.
pub trait SourceFormatter: Send + Sync {
    /// `path` locates `rustfmt.toml` and names the file in errors; the file
    /// itself is not read.
    fn format(
        &self,
        source: &str,
        path: &Path,
    ) -> impl Future<Output = Result<String, ToolchainError>> + Send;
}

/// Edition cargo assumes for a package that does not declare one.
const CARGO_DEFAULT_EDITION: &str = "2015";

#[derive(Debug, Clone)]
pub struct Rustfmt {
    binary: String,
    env: ToolEnvironment,
}

impl Rustfmt {
    #[must_use]
    pub fn new(config: &ToolchainConfig, env: ToolEnvironment) -> Self {
        Self {
            binary: config.rustfmt().to_string(),
            env,
        }
    }
}

fn rustfmt_args(edition: Option<&str>) -> Vec<String> {
    let mut args = vec!["--emit".to_string(), "stdout".to_string()];
    if let Some(edition) = edition {
        args.extend(["--edition".to_string(), edition.to_string()]);
    }
    args
}

/// Edition of the package that owns `path`, from the nearest `Cargo.toml`.
///
/// `edition.workspace = true` is followed up to the workspace manifest.
/// `None` when no manifest declares one, leaving the choice to rustfmt.
fn manifest_edition(path: &Path) -> Option<String> {
    let mut in_package = false;
    for dir in path.ancestors().skip(1) {
        let manifest = dir.join("Cargo.toml");
        let Ok(text) = fs::read_to_string(&manifest) else {
            continue;
        };
        let table: toml::Table = match toml::from_str(&text) {
            Ok(table) => table,
            Err(e) => {
                tracing::debug!(manifest = %manifest.display(), "Unreadable manifest: {e}");
                return None;
            }
        };

        let workspace_edition = table
            .get("workspace")
            .and_then(|workspace| workspace.get("package"))
            .and_then(|package| package.get("edition"))
            .and_then(toml::Value::as_str)
            .map(str::to_string);
        if in_package {
            if workspace_edition.is_some() {
                return workspace_edition;
            }
            continue;
        }
        if let Some(package) = table.get("package") {
            match package.get("edition") {
                Some(toml::Value::String(edition)) => return Some(edition.clone()),
                Some(_) if workspace_edition.is_some() => return workspace_edition,
                Some(_) => in_package = true,
                None => return Some(CARGO_DEFAULT_EDITION.to_string()),
            }
        }
    }
    None
}

impl SourceFormatter for Rustfmt {
    async fn format(&self, source: &str, path: &Path) -> Result<String, ToolchainError> {
        let cwd = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty() && dir.is_dir())
            .unwrap_or_else(|| Path::new("."));
        let edition = manifest_edition(path);
        let output = Invocation {
            tool: RUSTFMT,
            binary: &self.binary,
            args: rustfmt_args(edition.as_deref()),
            cwd,
            env: &self.env,
            stdin: Some(source.to_string()),
            timeout: FORMAT_TIMEOUT,
        }
        .run()
        .await?
        .check(RUSTFMT)?;
        tracing::debug!(path = %path.display(), "rustfmt produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) -> std::path::PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn edition_is_passed_only_when_known() {
        assert_eq!(rustfmt_args(None), vec!["--emit", "stdout"]);
        assert_eq!(
            rustfmt_args(Some("2024")),
            vec!["--emit", "stdout", "--edition", "2024"]
        );
    }

    #[test]
    fn edition_comes_from_the_owning_package() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Cargo.toml",
            "[package]\nname = \"demo\"\nedition = \"2024\"\n",
        );
        let main = write(dir.path(), "src/bin/tool/main.rs", "fn main() {}\n");
        assert_eq!(manifest_edition(&main).as_deref(), Some("2024"));
    }

    #[test]
    fn package_without_edition_is_2015() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Cargo.toml", "[package]\nname = \"old\"\n");
        let lib = write(dir.path(), "src/lib.rs", "");
        assert_eq!(manifest_edition(&lib).as_deref(), Some("2015"));
    }

    #[test]
    fn inherited_edition_is_read_from_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Cargo.toml",
            "[workspace]\nmembers = [\"cli\"]\n\n[workspace.package]\nedition = \"2024\"\n",
        );
        write(
            dir.path(),
            "cli/Cargo.toml",
            "[package]\nname = \"cli\"\nedition.workspace = true\n",
        );
        let main = write(dir.path(), "cli/src/main.rs", "");
        assert_eq!(manifest_edition(&main).as_deref(), Some("2024"));
    }

    #[test]
    fn no_manifest_leaves_the_edition_to_rustfmt() {
        let dir = tempfile::tempdir().unwrap();
        let loose = write(dir.path(), "scratch.rs", "");
        assert_eq!(manifest_edition(&loose), None);
    }

    #[tokio::test]
    async fn missing_rustfmt_is_not_found() {
        let config = ToolchainConfig::new(".").with_rustfmt("ferrule-no-such-rustfmt-91ad");
        let fmt = Rustfmt::new(&config, ToolEnvironment::new());
        let err = fmt
            .format("fn main(){}", Path::new("src/main.rs"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::NotFound { tool: "rustfmt", .. }));
    }
}
