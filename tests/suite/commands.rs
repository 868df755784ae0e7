//! Palette commands against fake tools.

use std::str::FromStr;

use ferrule_engine::{CommandError, CommandOutcome, EditorSurface};
use ferrule_toolchain::{RunStatus, ToolEvent};
use ferrule_types::{EditorCommand, Profile, ToolCommand};

use crate::common::{Harness, Workspace};
#[cfg(unix)]
use crate::common::{
    FAKE_CARGO, FAKE_RUSTFMT, FORMATTED_MAIN, SLOW_CARGO, UNFORMATTED_MAIN, scripted_settings,
};

#[test]
fn every_palette_command_parses_from_its_name() {
    let names: Vec<String> = EditorCommand::all().map(EditorCommand::name).collect();
    assert_eq!(names.len(), 20);
    for name in &names {
        let command = EditorCommand::from_str(name).unwrap();
        assert_eq!(&command.name(), name);
    }
    assert!(names.contains(&"build-example-release".to_string()));
    assert!(names.contains(&"show-completion-errors".to_string()));
    assert!(EditorCommand::from_str("deploy").is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn example_commands_target_the_active_example() {
    let workspace = Workspace::new();
    let example = workspace.write("examples/demo.rs", "fn main() {}\n");
    let mut harness =
        Harness::activate(&workspace, scripted_settings(&workspace, FAKE_CARGO, FAKE_RUSTFMT))
            .await;
    let run_example = EditorCommand::Tool(ToolCommand::RunExample(Profile::Release));

    let err = harness.extension.execute(run_example).await.unwrap_err();
    assert!(matches!(err, CommandError::Tool(_)));
    assert!(err.to_string().contains("needs an example name"));

    harness.focus(&example).await;
    let outcome = harness.extension.execute(run_example).await.unwrap();
    assert!(matches!(outcome, CommandOutcome::Started(_)));
    harness
        .wait_for(ToolCommand::RunExample(Profile::Release))
        .await;
    assert_eq!(
        workspace.cargo_invocations(),
        vec!["run --example demo --release"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn terminate_kills_running_commands() {
    let workspace = Workspace::new();
    let mut harness =
        Harness::activate(&workspace, scripted_settings(&workspace, SLOW_CARGO, FAKE_RUSTFMT))
            .await;
    let build = ToolCommand::Build(Profile::Debug);

    let outcome = harness
        .extension
        .execute(EditorCommand::Tool(build))
        .await
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Started(_)));
    assert_eq!(harness.extension.runner().running_count(), 1);

    let terminated = harness.extension.execute(EditorCommand::Terminate).await;
    assert!(matches!(terminated, Ok(CommandOutcome::Terminated(1))));

    let events = harness.wait_for(build).await;
    assert!(matches!(
        events.last(),
        Some(ToolEvent::Finished {
            status: RunStatus::Terminated,
            ..
        })
    ));
    assert_eq!(harness.extension.runner().running_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn format_document_edits_the_buffer_only() {
    let workspace = Workspace::new();
    let main = workspace.write("src/main.rs", UNFORMATTED_MAIN);
    let harness =
        Harness::activate(&workspace, scripted_settings(&workspace, FAKE_CARGO, FAKE_RUSTFMT))
            .await;
    let document = harness.focus(&main).await;

    let outcome = harness
        .extension
        .execute(EditorCommand::FormatDocument)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::Formatted { edits: 1, .. }
    ));
    let buffer = harness.surface.document(document.id()).unwrap();
    assert_eq!(buffer.text(), FORMATTED_MAIN);
    assert_eq!(workspace.read("src/main.rs"), UNFORMATTED_MAIN);
    assert!(workspace.cargo_invocations().is_empty());
}

#[tokio::test]
async fn missing_cargo_is_reported_on_the_results_surface() {
    let workspace = Workspace::new();
    let mut harness = Harness::activate(
        &workspace,
        ferrule_config::Settings {
            cargo_path: Some("ferrule-no-such-cargo-e41f".to_string()),
            ..ferrule_config::Settings::default()
        },
    )
    .await;

    let err = harness
        .extension
        .execute(EditorCommand::Tool(ToolCommand::Doc))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ferrule-no-such-cargo-e41f"));

    let events = harness.wait_for(ToolCommand::Doc).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ToolEvent::Failed { .. }));
    assert!(
        harness
            .output
            .last_run()
            .unwrap()
            .status_line()
            .starts_with("cargo doc:")
    );
}

#[tokio::test]
async fn completion_errors_start_empty() {
    let workspace = Workspace::new();
    let harness = Harness::activate(&workspace, ferrule_config::Settings::default()).await;
    match harness
        .extension
        .execute(EditorCommand::ShowCompletionErrors)
        .await
    {
        Ok(CommandOutcome::CompletionErrors(entries)) => assert!(entries.is_empty()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
