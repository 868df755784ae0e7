//! Settings loading and conflict resolution through the extension.

use ferrule_config::{ConflictChoice, Settings};
use ferrule_engine::EditorEvent;
use ferrule_types::{CheckWith, ErrorFormat, RUST_SRC_PATH};

use crate::common::{Harness, ScriptedPrompt, Workspace};

fn conflicting() -> Settings {
    Settings {
        use_json_errors: true,
        use_new_error_format: true,
        ..Settings::default()
    }
}

#[tokio::test]
async fn workspace_file_drives_activation() {
    let workspace = Workspace::new();
    workspace.write(
        ".ferrule.toml",
        r#"
[rust]
formatOnSave = true
checkOnSave = true
checkWith = "lint-everything"
useNewErrorFormat = true
rustLangSrcPath = "/opt/rust/library"
"#,
    );
    let settings = Settings::load(workspace.root()).unwrap();
    let harness = Harness::activate(&workspace, settings).await;

    let effective = harness.extension.settings();
    assert!(effective.format_on_save);
    assert!(effective.check_on_save);
    assert_eq!(effective.check_with, CheckWith::Check);
    assert_eq!(effective.error_format, ErrorFormat::Human);
    assert_eq!(
        harness.extension.environment().get(RUST_SRC_PATH).as_deref(),
        Some("/opt/rust/library")
    );
    assert_eq!(harness.prompt.asked(), 0);
}

#[tokio::test]
async fn malformed_workspace_file_is_an_error() {
    let workspace = Workspace::new();
    workspace.write(".ferrule.toml", "[rust\nformatOnSave = true\n");
    let err = Settings::load(workspace.root()).unwrap_err();
    assert!(err.path().ends_with(".ferrule.toml"));
}

#[tokio::test]
async fn conflict_prompts_on_every_resolution() {
    let workspace = Workspace::new();
    let prompt = ScriptedPrompt::answering([
        None,
        Some(ConflictChoice::Ignore),
        Some(ConflictChoice::UpdateSettings),
    ]);
    let harness = Harness::activate_with_prompt(&workspace, conflicting(), prompt).await;

    // Dismissed at activation: the previous (default) format stays.
    assert_eq!(harness.prompt.asked(), 1);
    assert_eq!(harness.extension.settings().error_format, ErrorFormat::Human);

    harness
        .extension
        .handle_event(EditorEvent::ConfigurationChanged(conflicting()))
        .await;
    assert_eq!(harness.prompt.asked(), 2);
    assert_eq!(harness.extension.settings().error_format, ErrorFormat::Json);
    assert_eq!(harness.prompt.opened(), 0);

    harness
        .extension
        .handle_event(EditorEvent::ConfigurationChanged(conflicting()))
        .await;
    assert_eq!(harness.prompt.asked(), 3);
    assert_eq!(harness.prompt.opened(), 1);
    assert_eq!(harness.extension.settings().error_format, ErrorFormat::Json);
}

#[tokio::test]
async fn json_only_never_prompts() {
    let workspace = Workspace::new();
    let json_only = Settings {
        use_json_errors: true,
        ..Settings::default()
    };
    let harness = Harness::activate(&workspace, json_only.clone()).await;
    for _ in 0..3 {
        harness
            .extension
            .handle_event(EditorEvent::ConfigurationChanged(json_only.clone()))
            .await;
        assert_eq!(harness.extension.settings().error_format, ErrorFormat::Json);
    }
    assert_eq!(harness.prompt.asked(), 0);
}
