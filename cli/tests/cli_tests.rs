use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Build an `authzctl` command isolated from the caller's environment
fn authzctl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("authzctl").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("AUTHZ_TABLE_PATH")
        .env_remove("AUDIT_LOG_PATH")
        .env_remove("SESSION_TTL_SECONDS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_table(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("permissions.yaml");
    fs::write(
        &path,
        r#"id: permissions
name: Test permissions
version: 1.0.0
entries:
  - role: nurse
    resource: patients
    actions: [read]
  - role: assistant
    resource: inventory
    actions: [read, update]
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("authzctl"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("export-cedar"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("authzctl"));
}

#[test]
fn test_check_allowed() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "physician", "patients:update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"))
        .stdout(predicate::str::contains("patients:update"));
}

#[test]
fn test_check_denied_exits_with_two() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "front-desk", "settings:read"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("DENIED"))
        .stdout(predicate::str::contains("insufficient_permissions"));
}

#[test]
fn test_check_all_requires_every_pair() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args([
            "check",
            "--role",
            "clinic-admin",
            "settings:update",
            "settings:delete",
        ])
        .assert()
        .code(2);
}

#[test]
fn test_check_any_mode() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args([
            "check",
            "--role",
            "clinic-admin",
            "--any",
            "settings:update",
            "settings:delete",
        ])
        .assert()
        .success();
}

#[test]
fn test_check_json_output() {
    let dir = TempDir::new().unwrap();
    let output = authzctl(&dir)
        .args([
            "check",
            "--role",
            "patient",
            "--format",
            "json",
            "appointments:create",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["allowed"], true);
    assert_eq!(json["role"], "patient");
    assert_eq!(json["checks"][0]["allowed"], true);
}

#[test]
fn test_check_unknown_role_fails_closed() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "janitor", "patients:read"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unknown role"));
}

#[test]
fn test_check_unknown_resource_denied() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "super-admin", "pharmacy:read"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unknown_resource_or_role"));
}

#[test]
fn test_check_malformed_requirement() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "nurse", "patients"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("resource:action"));
}

#[test]
fn test_check_with_table_file() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);

    authzctl(&dir)
        .arg("--table")
        .arg(&table)
        .args(["check", "--role", "assistant", "inventory:update"])
        .assert()
        .success();

    // Physician has no entries in this table.
    authzctl(&dir)
        .arg("--table")
        .arg(&table)
        .args(["check", "--role", "physician", "patients:read"])
        .assert()
        .code(2);
}

#[test]
fn test_table_from_env() {
    let dir = TempDir::new().unwrap();
    write_table(&dir);

    authzctl(&dir)
        .env("AUTHZ_TABLE_PATH", "permissions.yaml")
        .args(["table", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("role: nurse"))
        .stdout(predicate::str::contains("physician").not());
}

#[test]
fn test_invalid_table_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(
        &path,
        "id: permissions\nname: Broken\nversion: 1.0.0\nentries:\n  - role: nurse\n    resource: patients\n    actions: [fly]\n",
    )
    .unwrap();

    authzctl(&dir)
        .arg("--table")
        .arg(&path)
        .arg("table")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load permission table"));
}

#[test]
fn test_table_text() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .arg("table")
        .assert()
        .success()
        .stdout(predicate::str::contains("Permission Table"))
        .stdout(predicate::str::contains("super-admin"))
        .stdout(predicate::str::contains("Total:"));
}

#[test]
fn test_table_json() {
    let dir = TempDir::new().unwrap();
    let output = authzctl(&dir)
        .args(["table", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["entries"].as_array().unwrap().len() > 10);
}

#[test]
fn test_export_cedar() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .arg("export-cedar")
        .assert()
        .success()
        .stdout(predicate::str::contains("permit("))
        .stdout(predicate::str::contains("principal == Role::\"physician\""));
}

#[test]
fn test_denials_are_audited_and_verified() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("audit").join("denials.log");

    authzctl(&dir)
        .args(["check", "--role", "nurse", "--enterprise", "ent-7", "billing:delete"])
        .arg("--audit-log")
        .arg(&log)
        .assert()
        .code(2);

    // Granted checks leave no trace.
    authzctl(&dir)
        .args(["check", "--role", "physician", "patients:read"])
        .arg("--audit-log")
        .arg(&log)
        .assert()
        .success();

    authzctl(&dir)
        .args(["audit", "verify"])
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("1 entries"));

    authzctl(&dir)
        .env("AUDIT_LOG_PATH", &log)
        .args(["audit", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("billing:delete"))
        .stdout(predicate::str::contains("ent-7"));
}

#[test]
fn test_audit_verify_detects_tampering() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("denials.log");

    for role in ["nurse", "assistant"] {
        authzctl(&dir)
            .args(["check", "--role", role, "hr:read"])
            .arg("--audit-log")
            .arg(&log)
            .assert()
            .code(2);
    }

    let content = fs::read_to_string(&log).unwrap();
    fs::write(&log, content.replacen("\"hr\"", "\"billing\"", 1)).unwrap();

    authzctl(&dir)
        .args(["audit", "verify"])
        .arg(&log)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"));
}

#[test]
fn test_audit_without_path() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["audit", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("AUDIT_LOG_PATH"));
}

#[test]
fn test_unknown_role_denial_is_audited() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("denials.log");

    authzctl(&dir)
        .args(["check", "--role", "janitor", "patients:read"])
        .arg("--audit-log")
        .arg(&log)
        .assert()
        .code(2);

    let lines: Vec<String> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("unknown_resource_or_role"));

    authzctl(&dir)
        .args(["audit", "verify"])
        .arg(&log)
        .assert()
        .success();
}

#[test]
fn test_check_redirect_on_denial() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "front-desk", "--redirect", "/login", "settings:read"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Navigate: /login"));

    // A grant never navigates.
    authzctl(&dir)
        .args(["check", "--role", "physician", "--redirect", "/login", "patients:read"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Navigate").not());
}

#[test]
fn test_check_without_redirect_renders_fallback() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "patient", "billing:read"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Render: fallback"));
}

#[test]
fn test_check_guard_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("guard.yaml");
    fs::write(&config, "redirect_on_denial: /no-access\n").unwrap();

    let output = authzctl(&dir)
        .args(["check", "--role", "nurse", "--format", "json", "hr:read"])
        .arg("--guard-config")
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["navigate"], "/no-access");
}

#[test]
fn test_check_rejects_relative_redirect() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["check", "--role", "nurse", "--redirect", "login", "hr:read"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absolute path"));
}

#[test]
fn test_export_cedar_verify() {
    let dir = TempDir::new().unwrap();
    authzctl(&dir)
        .args(["export-cedar", "--verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("agree with the table"));
}

#[test]
fn test_log_dir_writes_file() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");

    authzctl(&dir)
        .arg("--log-dir")
        .arg(&logs)
        .args(["-v", "check", "--role", "physician", "patients:read"])
        .assert()
        .success();

    let files: Vec<_> = fs::read_dir(&logs)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("authzctl"))
        .collect();
    assert_eq!(files.len(), 1);
    assert!(fs::read_to_string(files[0].path()).unwrap().contains("AUTHZ"));
}
