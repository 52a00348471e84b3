use super::common::{self, Project};
use std::path::Path;
use std::process::{Command, Output};

fn modeguard(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modeguard"))
        .current_dir(cwd)
        .args(args)
        // Keep external linters from being discovered on the host.
        .env("PATH", "")
        .output()
        .expect("run modeguard")
}

fn compliant_project() -> Project {
    let project = Project::new(&common::document(&[common::compliant_mode("coder")]));
    project.compliant_companions("coder");
    project
}

#[test]
fn passing_run_prints_confirmation_and_exits_zero() {
    let project = compliant_project();
    let output = modeguard(project.root(), &[]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("OK: `"), "{}", stdout);
    assert!(stdout.contains("validation passed."));
}

#[test]
fn root_is_discovered_from_nested_directory() {
    let project = compliant_project();
    project.write("src/deep/keep.txt", "");
    let output = modeguard(&project.root().join("src/deep"), &[]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn validation_failure_exits_one_with_stage_heading() {
    let mode = common::mode_entry(
        "coder",
        &["read", "['edit', {fileRegex: '^src/auth/.*$'}]"],
        common::PROTOCOL_INSTRUCTIONS,
    );
    let project = Project::new(&common::document(&[mode]));
    project.compliant_companions("coder");

    let output = modeguard(project.root(), &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Security validation errors:"), "{}", stderr);
    assert!(stderr.contains("coder: Can access forbidden auth_files (ERROR) - src/auth/file.ts"));
}

#[test]
fn tabs_exit_with_fatal_status() {
    let project = Project::new("customModes:\n\t- slug: coder\n");
    let output = modeguard(project.root(), &[]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Tabs detected in file. Only spaces are allowed."));
}

#[test]
fn missing_root_exits_three() {
    let tmp = tempfile::tempdir().unwrap();
    if tmp.path().ancestors().any(|dir| dir.join(".roomodes").exists()) {
        return;
    }
    let output = modeguard(tmp.path(), &[]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Could not find project root"));
}

#[test]
fn unknown_flag_is_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let output = modeguard(tmp.path(), &["--no-such-flag"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn zero_indent_is_usage_error() {
    let project = compliant_project();
    let output = modeguard(project.root(), &["--indent", "0"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn json_format_emits_summary_document() {
    let project = compliant_project();
    let output = modeguard(project.root(), &["--format", "json"]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "pass");
    assert_eq!(json["report"]["outcome"]["status"], "passed");
}

#[test]
fn summary_flag_writes_reports_and_handoff() {
    let project = compliant_project();
    let output = modeguard(project.root(), &["--summary"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(project.root().join(".roo/reports/mode_validation_summary.json").is_file());
    assert!(project.root().join(".roo/reports/mode_validation_summary.md").is_file());

    let handoff: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(project.root().join(".roo/handoff/mode_validation_handoff.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(handoff["receiver_slug"], "mode-writer");
    assert_eq!(handoff["status"], "pass");
}

#[test]
fn external_linters_are_skipped_when_absent() {
    let project = compliant_project();
    let output = modeguard(project.root(), &["--external-linters"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("! yamllint not found; skipping. Install with: pip install yamllint"));
    assert!(stdout.contains(
        "! opa not found; skipping. Install from: https://www.openpolicyagent.org/docs/latest/#running-opa"
    ));
}

#[test]
fn indent_override_applies() {
    let yaml = "customModes:\n    - slug: coder\n      name: coder\n      groups:\n        - read\n";
    let project = Project::new(yaml);
    let output = modeguard(project.root(), &["--indent", "3"]);
    assert_eq!(output.status.code(), Some(4));
}
