use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hearex"))
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hearex-cli-{}-{}", name, std::process::id()))
}

#[test]
fn simulate_then_analyze() {
    let out_dir = scratch("simulate");
    let output = cli()
        .args(["simulate", "--seed", "7", "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .expect("simulate command");
    assert!(
        output.status.success(),
        "simulate exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(stdout.contains("VGRM"), "expected summary table, got {stdout}");

    let summary: Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("summary.json")).expect("summary written"),
    )
    .expect("valid summary JSON");
    assert_eq!(summary["conditions"].as_array().map(Vec::len), Some(4));
    assert_eq!(summary["vgrm"].as_array().map(Vec::len), Some(2));

    let log = std::fs::read_to_string(out_dir.join("trials.jsonl")).expect("trial log written");
    let first: Value = serde_json::from_str(log.lines().next().expect("at least one row")).unwrap();
    assert_eq!(first["trial_index"], 1);
    assert_eq!(first["is_reversal"], false);

    let analyzed = out_dir.join("analyzed.json");
    let output = cli()
        .args([
            "analyze",
            "--log",
            out_dir.join("trials.jsonl").to_str().unwrap(),
            "--output",
            analyzed.to_str().unwrap(),
        ])
        .output()
        .expect("analyze command");
    assert!(output.status.success(), "analyze exited with {:?}", output.status.code());
    let rebuilt: Value =
        serde_json::from_str(&std::fs::read_to_string(&analyzed).unwrap()).unwrap();
    for (live, offline) in summary["conditions"]
        .as_array()
        .unwrap()
        .iter()
        .zip(rebuilt["conditions"].as_array().unwrap())
    {
        assert_eq!(live["key"], offline["key"]);
        assert_eq!(live["runs_used"], offline["runs_used"]);
    }

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn config_command_writes_defaults() {
    let path = scratch("config").with_extension("json");
    let output = cli()
        .args(["config", "--out", path.to_str().unwrap()])
        .output()
        .expect("config command");
    assert!(output.status.success());
    let json: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["staircase"]["target_reversals"], 14);
    assert_eq!(json["threshold"]["window"]["kind"], "skip_first");
    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_log_fails() {
    let output = cli()
        .args(["analyze", "--log", "/nonexistent/hearex/trials.jsonl"])
        .output()
        .expect("analyze command");
    assert!(!output.status.success());
}
