use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Build a minimal valid TOML config for sim mode. Motion dwells are cut to
// near-zero so a full cycle finishes in milliseconds instead of seconds.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[stabilizer]
history_size = 10
stability_threshold = 3
pixel_tolerance = 20.0

[motion]
ms_per_degree = 0.05
min_move_ms = 1
max_move_ms = 2
min_dwell_ms = 1
settle_pad_ms = 0
gripper_move_ms = 1
gripper_settle_ms = 1

[placement]
mode = "tower"
base = [0.0, 250.0, 50.0]
cup_height = 60.0

[session]
max_placements = 1
max_run_ms = 8000
detect_hz = 25
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check-config"], 0, "config ok", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["run"], 0, "placed 1", "stdout")]
#[case(&["run", "--max-placements"], 2, "value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("armpick_cli").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);

    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert();

    let assert = if exit_code >= 0 {
        assert.code(exit_code)
    } else {
        assert.failure()
    };

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn run_emits_json_summary_when_asked() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let output = Command::cargo_bin("armpick_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("run")
        .arg("--print-runtime")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with('{'))
        .expect("no JSON line on stdout");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["status"], "complete");
    assert_eq!(v["placed"], 1);
    assert_eq!(v["stack_height_mm"], 60.0);
    assert!(v["runtime_ms"].is_u64());
}

#[rstest]
fn cli_rejects_inverted_workspace_bounds() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("bad.toml");
    fs::write(
        &bad,
        r#"
[workspace]
x_min = 150.0
x_max = -150.0
"#,
    )
    .unwrap();

    Command::cargo_bin("armpick_cli")
        .unwrap()
        .arg("--config")
        .arg(&bad)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("x_min"));
}

#[rstest]
fn cli_reports_bad_slot_csv_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("slots.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "x,y,height").unwrap();
    writeln!(f, "0.0,250.0,50.0").unwrap();

    Command::cargo_bin("armpick_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--slots")
        .arg(&bad_csv)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected 'x,y,z'"));
}
