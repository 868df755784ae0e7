//! Save pipeline end to end: file-backed surface, fake rustfmt and cargo.

#![cfg(unix)]

use std::thread;
use std::time::{Duration, Instant};

use ferrule_engine::{CheckStage, EditorEvent, FormatStage};
use ferrule_toolchain::{LastRun, RunStatus, ToolEvent};
use ferrule_types::{CheckWith, Document, DocumentId, ToolCommand};

use crate::common::{
    BROKEN_RUSTFMT, FAKE_CARGO, FAKE_RUSTFMT, FORMATTED_MAIN, Harness, LATE_CARGO,
    UNFORMATTED_MAIN, Workspace, scripted_settings,
};

fn on_save(workspace: &Workspace, rustfmt: &str, check_with: CheckWith) -> ferrule_config::Settings {
    ferrule_config::Settings {
        format_on_save: true,
        check_on_save: true,
        check_with,
        ..scripted_settings(workspace, FAKE_CARGO, rustfmt)
    }
}

#[tokio::test]
async fn save_formats_resaves_once_then_checks() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", UNFORMATTED_MAIN);
    let mut harness = Harness::activate(
        &workspace,
        on_save(&workspace, FAKE_RUSTFMT, CheckWith::Clippy),
    )
    .await;
    let document = harness.focus(&main).await;

    let outcome = harness
        .extension
        .handle_event(EditorEvent::DocumentSaved(document))
        .await
        .expect("save admitted")
        .await
        .unwrap();

    assert_eq!(outcome.format, FormatStage::Formatted { edits: 1 });
    assert_eq!(outcome.check, CheckStage::Dispatched(ToolCommand::Clippy));
    assert_eq!(workspace.read("src/main.rs"), FORMATTED_MAIN);
    assert_eq!(harness.extension.orchestrator().in_flight(), 0);

    harness.wait_for(ToolCommand::Clippy).await;
    assert_eq!(workspace.cargo_invocations(), vec!["clippy"]);

    let snapshot = harness.output.snapshot();
    assert_eq!(snapshot.error_count(), 1);
    assert_eq!(snapshot.files()[0].0, main);
    assert_eq!(
        harness.output.last_run(),
        Some(&LastRun::Finished {
            command: ToolCommand::Clippy,
            status: RunStatus::Failed(Some(101)),
        })
    );
}

#[tokio::test]
async fn saving_a_readme_does_nothing() {
    let workspace = Workspace::new();
    let readme = workspace.write("README.md", "# demo\n");
    let harness = Harness::activate(
        &workspace,
        on_save(&workspace, FAKE_RUSTFMT, CheckWith::Check),
    )
    .await;
    let document = harness.focus(&readme).await;

    let pipeline = harness
        .extension
        .handle_event(EditorEvent::DocumentSaved(document))
        .await;

    assert!(pipeline.is_none());
    tokio::task::yield_now().await;
    assert!(workspace.cargo_invocations().is_empty());
    assert_eq!(workspace.read("README.md"), "# demo\n");
}

#[tokio::test]
async fn rust_text_in_a_non_rust_buffer_is_ignored() {
    let workspace = Workspace::new();
    let harness = Harness::activate(
        &workspace,
        on_save(&workspace, FAKE_RUSTFMT, CheckWith::Check),
    )
    .await;
    let document = Document::new(
        DocumentId::new(workspace.root().join("src/main.rs")),
        "plaintext",
        UNFORMATTED_MAIN,
    );

    assert!(
        harness
            .extension
            .handle_event(EditorEvent::DocumentSaved(document))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn formatter_failure_keeps_the_save_and_still_checks() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", UNFORMATTED_MAIN);
    let mut harness = Harness::activate(
        &workspace,
        on_save(&workspace, BROKEN_RUSTFMT, CheckWith::Check),
    )
    .await;
    let document = harness.focus(&main).await;

    let outcome = harness
        .extension
        .handle_event(EditorEvent::DocumentSaved(document))
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome.format, FormatStage::FormatFailed);
    assert_eq!(outcome.check, CheckStage::Dispatched(ToolCommand::Check));
    assert_eq!(workspace.read("src/main.rs"), UNFORMATTED_MAIN);

    harness.wait_for(ToolCommand::Check).await;
    assert_eq!(workspace.cargo_invocations(), vec!["check"]);
}

#[tokio::test]
async fn every_user_save_runs_the_whole_pipeline() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", UNFORMATTED_MAIN);
    let mut harness = Harness::activate(
        &workspace,
        on_save(&workspace, FAKE_RUSTFMT, CheckWith::CheckLib),
    )
    .await;

    for _ in 0..2 {
        let document = harness.focus(&main).await;
        let outcome = harness
            .extension
            .handle_event(EditorEvent::DocumentSaved(document))
            .await
            .unwrap()
            .await
            .unwrap();
        assert!(matches!(outcome.format, FormatStage::Formatted { .. }));
        harness.wait_for(ToolCommand::CheckLib).await;
    }

    assert_eq!(
        workspace.cargo_invocations(),
        vec!["check --lib", "check --lib"]
    );
    assert_eq!(workspace.read("src/main.rs"), FORMATTED_MAIN);
}

#[tokio::test]
async fn json_errors_reach_cargo() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", FORMATTED_MAIN);
    let mut harness = Harness::activate(
        &workspace,
        ferrule_config::Settings {
            check_on_save: true,
            use_json_errors: true,
            ..scripted_settings(&workspace, FAKE_CARGO, FAKE_RUSTFMT)
        },
    )
    .await;
    let document = harness.focus(&main).await;

    let outcome = harness
        .extension
        .handle_event(EditorEvent::DocumentSaved(document))
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome.format, FormatStage::Disabled);
    harness.wait_for(ToolCommand::Check).await;
    assert_eq!(
        workspace.cargo_invocations(),
        vec!["check --message-format=json"]
    );
}

// The host returns as soon as the check has started and tears its runtime
// down; the check must still run to completion.
#[test]
fn detached_check_outlives_the_host() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", FORMATTED_MAIN);
    let settings = ferrule_config::Settings {
        check_on_save: true,
        ..scripted_settings(&workspace, LATE_CARGO, FAKE_RUSTFMT)
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut harness = Harness::activate(&workspace, settings).await;
        harness.extension.runner().set_detached(true);
        let document = harness.focus(&main).await;

        let outcome = harness
            .extension
            .handle_event(EditorEvent::DocumentSaved(document))
            .await
            .unwrap()
            .await
            .unwrap();
        assert_eq!(outcome.check, CheckStage::Dispatched(ToolCommand::Check));

        let started = harness.output.wait_for_start(ToolCommand::Check).await;
        assert!(matches!(started, Some(ToolEvent::Started { .. })));
    });
    drop(runtime);

    let deadline = Instant::now() + Duration::from_secs(10);
    while workspace.cargo_invocations().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(workspace.cargo_invocations(), vec!["check"]);
}
