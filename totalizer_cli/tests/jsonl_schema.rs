use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// One on-command channel so the trace exercises command events too.
fn write_config(dir: &Path) -> PathBuf {
    let toml = format!(
        r#"
[store]
path = '{}'

[[channel]]
capacity = 100.0
mode = "on-command"
rise_pct = 5.0
drop_pct = 2.0
min_stable_ms = 300
pending_ms = 1000

[channel.sensor]
decimals = 1
increment = 0.1
sample_rate_hz = 10
"#,
        dir.join("totals.toml").display()
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_trace(dir: &Path) -> PathBuf {
    let csv = "t_ms,channel,weight,motion,overload,command\n\
               0,0,0.0,false,false,\n\
               200,0,40.0,true,false,\n\
               300,0,40.0,false,false,\n\
               400,0,40.0,false,false,\n\
               500,0,40.0,false,false,\n\
               600,0,40.0,false,false,total\n\
               700,0,40.0,false,false,total\n";
    let path = dir.join("trace.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("every stdout line is JSON"))
        .collect()
}

/// Validate the JSONL schema of a replay run.
#[rstest]
fn jsonl_replay_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let trace = write_trace(dir.path());

    let out = Command::cargo_bin("totalizer")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--trace")
        .arg(&trace)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);

    let commands: Vec<_> = lines.iter().filter(|v| v["event"] == "command").collect();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0]["outcome"], "committed");
    assert!(commands[0]["window_ms"].is_null());
    assert_eq!(commands[0]["not_allow"], false);
    // Second press on the same load is refused and opens a pending window.
    assert_eq!(commands[1]["outcome"], "pending");
    assert!(commands[1]["window_ms"].as_u64().is_some());
    assert_eq!(commands[1]["not_allow"], true);

    let commit = lines
        .iter()
        .find(|v| v["event"] == "commit")
        .expect("commit event");
    assert_eq!(commit["t_ms"].as_u64(), Some(600));
    assert_eq!(commit["channel"].as_u64(), Some(0));
    assert_eq!(commit["outcome"], "counted");
    assert_eq!(commit["weight"].as_f64(), Some(40.0));
    assert_eq!(commit["num_total"].as_u64(), Some(1));

    let summary = lines
        .iter()
        .find(|v| v["event"] == "summary")
        .expect("summary event");
    assert_eq!(summary["mode"], "on-command");
    assert_eq!(summary["num_total"].as_u64(), Some(1));
    assert_eq!(summary["total_wt"].as_f64(), Some(40.0));
    // Sample deviation needs two totals.
    assert!(summary["std_dev_wt"].is_null());
}

/// Errors in --json mode are one JSON object on stderr.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());

    let out = Command::cargo_bin("totalizer")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("set-mode")
        .arg("--channel")
        .arg("0")
        .arg("--mode")
        .arg("bogus")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or("");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(v["reason"], "Error");
    assert!(v["message"].as_str().unwrap_or("").contains("bogus"));
}
