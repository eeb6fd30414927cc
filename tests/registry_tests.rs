mod common;

use common::RecordingShell;
use sbatchreg::config::RegistryConfig;
use sbatchreg::error::RegistryError;
use sbatchreg::registry::{JobRegistry, JobStatus, SubmitOverrides};
use sbatchreg::runner::{CommandLine, CommandRunner};

/// Create a registry backed by a recording shell, keeping a handle on
/// the shell for call inspection.
fn test_registry(config: RegistryConfig) -> (JobRegistry<RecordingShell>, RecordingShell) {
    let shell = RecordingShell::new();
    let registry = JobRegistry::with_runner(config, CommandRunner::with_shell(shell.clone()));
    (registry, shell)
}

fn armed_config() -> RegistryConfig {
    RegistryConfig::default().with_dry_run(false)
}

#[test]
fn test_sequence_ids_are_contiguous() {
    let shell = RecordingShell::with_exit_code(1);
    let mut registry = JobRegistry::with_runner(
        armed_config(),
        CommandRunner::with_shell(shell.clone()),
    );

    // Failures still consume ids: 1..K regardless of outcome
    for i in 0..5 {
        registry
            .submit(format!("step {i}"), SubmitOverrides::default())
            .unwrap();
    }

    let ids: Vec<u64> = registry.list().iter().map(|r| r.sequence_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(registry.list().iter().all(|r| r.status == JobStatus::Failed));
}

#[test]
fn test_dry_run_never_invokes_shell() {
    let (mut registry, shell) = test_registry(armed_config());

    let record = registry
        .submit("rm -rf /important", SubmitOverrides::default().with_dry_run(true))
        .unwrap();

    assert_eq!(record.status, JobStatus::SkippedDryRun);
    assert_eq!(shell.call_count(), 0);
}

#[test]
fn test_registry_default_is_dry_run() {
    let (mut registry, shell) = test_registry(RegistryConfig::default());

    let record = registry.submit("ls", SubmitOverrides::default()).unwrap();

    assert_eq!(record.status, JobStatus::SkippedDryRun);
    assert_eq!(shell.call_count(), 0);
}

#[test]
fn test_failed_command_is_recorded_not_raised() {
    let shell = RecordingShell::with_exit_code(2);
    let mut registry = JobRegistry::with_runner(
        armed_config(),
        CommandRunner::with_shell(shell.clone()),
    );

    let record = registry
        .submit("does-not-matter", SubmitOverrides::default())
        .unwrap();

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.exit_code, Some(2));
    assert_eq!(shell.call_count(), 1);
}

#[test]
fn test_submit_empty_command_is_rejected() {
    let (mut registry, shell) = test_registry(armed_config());

    let err = registry.submit("   ", SubmitOverrides::default()).unwrap_err();

    assert!(matches!(err, RegistryError::InvalidArgument { .. }));
    // Nothing was appended and nothing ran
    assert!(registry.is_empty());
    assert_eq!(shell.call_count(), 0);
}

#[test]
fn test_overrides_take_precedence_over_defaults() {
    let (mut registry, _shell) = test_registry(armed_config());

    let record = registry
        .submit(
            "ls",
            SubmitOverrides::default()
                .with_job_name("custom")
                .with_output_dir("/scratch/elsewhere")
                .with_dry_run(true),
        )
        .unwrap();

    assert_eq!(record.job_name, "custom");
    assert_eq!(record.output_dir, "/scratch/elsewhere");
    assert_eq!(record.status, JobStatus::SkippedDryRun);
}

#[test]
fn test_default_job_name_uses_prefix_and_id() {
    let (mut registry, _shell) = test_registry(
        RegistryConfig::new("out", "exp").with_dry_run(false),
    );

    registry.submit("a", SubmitOverrides::default()).unwrap();
    let record = registry.submit("b", SubmitOverrides::default()).unwrap();

    assert_eq!(record.job_name, "exp-2");
    assert!(record.script_text.contains("--job-name=exp-2"));
}

#[test]
fn test_replay_invokes_primitive_in_order() {
    let (mut registry, shell) = test_registry(armed_config());
    registry.submit("first", SubmitOverrides::default()).unwrap();
    registry
        .submit(
            vec!["second a".to_string(), "second b".to_string()],
            SubmitOverrides::default(),
        )
        .unwrap();
    let submit_calls = shell.call_count();

    let outcomes = registry.re_execute_all(None).unwrap();

    // One invocation per record, in sequence order, original commands
    assert_eq!(outcomes.len(), 2);
    let replay_calls = &shell.calls()[submit_calls..];
    assert_eq!(replay_calls, &["first", "second a; second b"]);
    // Replay does not grow the log
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_replay_dry_run_override_suppresses_execution() {
    let (mut registry, shell) = test_registry(armed_config());
    registry.submit("one", SubmitOverrides::default()).unwrap();
    registry.submit("two", SubmitOverrides::default()).unwrap();
    let submit_calls = shell.call_count();

    let outcomes = registry.re_execute_all(Some(true)).unwrap();

    assert_eq!(shell.call_count(), submit_calls);
    assert!(outcomes.iter().all(|o| o.status == JobStatus::SkippedDryRun));
}

#[test]
fn test_replay_execute_override_runs_dry_records() {
    let (mut registry, shell) = test_registry(RegistryConfig::default());
    registry.submit("queued", SubmitOverrides::default()).unwrap();
    assert_eq!(shell.call_count(), 0);

    let outcomes = registry.re_execute_all(Some(false)).unwrap();

    assert_eq!(shell.calls(), vec!["queued"]);
    assert_eq!(outcomes[0].status, JobStatus::Executed);
}

#[test]
fn test_round_trip_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");

    let (mut registry, _shell) = test_registry(
        RegistryConfig::new("out", "rt").with_dry_run(false),
    );
    registry.submit("echo one", SubmitOverrides::default()).unwrap();
    registry
        .submit("echo two", SubmitOverrides::default().with_dry_run(true))
        .unwrap();
    registry.save(&path).unwrap();

    let reloaded = JobRegistry::load(&path).unwrap();

    assert_eq!(reloaded.list(), registry.list());
    assert_eq!(reloaded.config(), registry.config());
}

#[test]
fn test_round_trip_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");

    let (registry, _shell) = test_registry(RegistryConfig::default());
    registry.save(&path).unwrap();

    let reloaded = JobRegistry::load(&path).unwrap();
    assert!(reloaded.is_empty());
    assert_eq!(reloaded.config(), registry.config());
}

#[test]
fn test_save_overwrites_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");

    let (mut registry, _shell) = test_registry(armed_config());
    registry.submit("one", SubmitOverrides::default()).unwrap();
    registry.save(&path).unwrap();
    registry.submit("two", SubmitOverrides::default()).unwrap();
    registry.save(&path).unwrap();

    let reloaded = JobRegistry::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[test]
fn test_save_to_unwritable_location_is_io_error() {
    let (registry, _shell) = test_registry(RegistryConfig::default());

    let err = registry
        .save("/nonexistent-dir/deeper/reg.json")
        .unwrap_err();

    assert!(matches!(err, RegistryError::Io { operation: "save", .. }));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = JobRegistry::load(dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, RegistryError::Io { operation: "load", .. }));
}

#[test]
fn test_load_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JobRegistry::load(&path).unwrap_err();

    assert!(matches!(err, RegistryError::CorruptData { .. }));
}

#[test]
fn test_load_rejects_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    // A record without its script or status
    std::fs::write(
        &path,
        r#"{"defaults":{"output_dir":"o","job_name_prefix":"j","dry_run":true},
           "records":[{"sequence_id":1,"raw_command":"ls"}]}"#,
    )
    .unwrap();

    let err = JobRegistry::load(&path).unwrap_err();

    assert!(matches!(err, RegistryError::CorruptData { .. }));
}

fn persisted_with_ids(ids: &[u64]) -> String {
    let records: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r##"{{"sequence_id":{id},"raw_command":"ls","script_text":"#!/bin/bash\n",
                    "job_name":"j-{id}","output_dir":"o","dry_run":true,
                    "status":"skipped-dry-run","submitted_at":"2026-01-01T00:00:00Z"}}"##
            )
        })
        .collect();
    format!(
        r#"{{"defaults":{{"output_dir":"o","job_name_prefix":"j","dry_run":true}},
            "records":[{}]}}"#,
        records.join(",")
    )
}

#[test]
fn test_load_rejects_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    std::fs::write(&path, persisted_with_ids(&[1, 1])).unwrap();

    let err = JobRegistry::load(&path).unwrap_err();

    assert!(matches!(err, RegistryError::CorruptData { .. }));
}

#[test]
fn test_load_rejects_id_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    std::fs::write(&path, persisted_with_ids(&[1, 3])).unwrap();

    let err = JobRegistry::load(&path).unwrap_err();

    assert!(matches!(err, RegistryError::CorruptData { .. }));
}

#[test]
fn test_load_rejects_ids_not_starting_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    std::fs::write(&path, persisted_with_ids(&[2, 3])).unwrap();

    let err = JobRegistry::load(&path).unwrap_err();

    assert!(matches!(err, RegistryError::CorruptData { .. }));
}

#[test]
fn test_accessors_on_empty_registry() {
    let (registry, _shell) = test_registry(RegistryConfig::default());

    assert!(registry.list().is_empty());
    assert!(registry.get_executed_commands().is_empty());
    assert!(registry.re_execute_all(None).unwrap().is_empty());
    registry.print_summary();
}

#[test]
fn test_get_executed_commands_preserves_order() {
    let (mut registry, _shell) = test_registry(armed_config());
    registry.submit("a", SubmitOverrides::default()).unwrap();
    registry.submit("b", SubmitOverrides::default()).unwrap();

    let commands = registry.get_executed_commands();

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].to_shell(), "a");
    assert_eq!(commands[1].to_shell(), "b");
}

/// The end-to-end scenario: a dry-run single command, an executed
/// sequence, a save/load round trip, then a full replay.
#[test]
fn test_example_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reg.json");
    let shell = RecordingShell::new();
    let mut registry = JobRegistry::with_runner(
        armed_config(),
        CommandRunner::with_shell(shell.clone()),
    );

    let record = registry
        .submit(
            "ls",
            SubmitOverrides::default()
                .with_dry_run(true)
                .with_job_name("t1")
                .with_output_dir("out"),
        )
        .unwrap();
    assert_eq!(record.sequence_id, 1);
    assert_eq!(record.status, JobStatus::SkippedDryRun);
    assert!(record.script_text.contains("ls"));
    assert!(record.script_text.contains("out"));

    let record = registry
        .submit(
            vec!["run_pipeline1 a".to_string(), "run_pipeline2 b".to_string()],
            SubmitOverrides::default(),
        )
        .unwrap();
    assert_eq!(record.sequence_id, 2);
    assert_eq!(record.status, JobStatus::Executed);

    registry.save(&path).unwrap();
    let reload_shell = RecordingShell::new();
    let reloaded =
        JobRegistry::load_with_runner(&path, CommandRunner::with_shell(reload_shell.clone()))
            .unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(
        reloaded.list().iter().map(|r| r.sequence_id).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(reloaded.list(), registry.list());

    let outcomes = reloaded.re_execute_all(Some(false)).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        reload_shell.calls(),
        vec![
            CommandLine::from("ls").to_shell(),
            "run_pipeline1 a; run_pipeline2 b".to_string(),
        ]
    );
}
