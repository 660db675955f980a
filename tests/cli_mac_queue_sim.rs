use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "tcq-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_summary(dir: &PathBuf, extra: &[&str]) -> Value {
    let summary = dir.join("summary.json");
    let output = Command::new(env!("CARGO_BIN_EXE_mac_queue_sim"))
        .env("RUST_LOG", "warn")
        .args(["--summary-json", summary.to_str().unwrap()])
        .args(extra)
        .output()
        .expect("run mac_queue_sim");
    assert!(
        output.status.success(),
        "mac_queue_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let raw = fs::read_to_string(&summary).expect("read summary.json");
    serde_json::from_str(&raw).expect("parse summary.json")
}

fn field(v: &Value, name: &str) -> u64 {
    v[name].as_u64().unwrap_or_else(|| panic!("missing {name}: {v}"))
}

#[test]
fn mac_queue_sim_accounts_for_every_frame() {
    for policy in ["drop-oldest", "drop-newest"] {
        let dir = unique_temp_dir("mac-policy");
        let v = run_summary(&dir, &["--drop-policy", policy]);
        let generated = field(&v, "generated");
        assert_eq!(generated, 800);
        assert_eq!(
            field(&v, "sent") + field(&v, "expired") + field(&v, "overflow") + field(&v, "flushed"),
            generated,
            "{policy}: {v}"
        );
        let _ = fs::remove_dir_all(&dir);
    }
}

#[test]
fn mac_queue_sim_short_lifetime_expires_frames() {
    let dir = unique_temp_dir("mac-lifetime");
    let v = run_summary(
        &dir,
        &[
            "--lifetime-ms",
            "5",
            "--frames",
            "20",
            "--service-us",
            "4000",
            "--blocked-until-ms",
            "0",
        ],
    );
    assert!(field(&v, "expired") > 0, "{v}");
    assert_eq!(field(&v, "overflow"), 0);
    assert!(v["blocked_first_tx_ns"].is_null());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn mac_queue_sim_writes_trace_json() {
    let dir = unique_temp_dir("mac-trace");
    let trace = dir.join("trace.json");
    let _ = run_summary(
        &dir,
        &[
            "--frames",
            "10",
            "--until-ms",
            "200",
            "--trace-json",
            trace.to_str().unwrap(),
        ],
    );
    let raw = fs::read_to_string(&trace).expect("read trace.json");
    let v: Value = serde_json::from_str(&raw).expect("parse trace.json");
    let arr = v.as_array().expect("trace.json must be a JSON array");
    assert!(
        arr.iter()
            .any(|e| e.get("kind").and_then(|k| k.as_str()) == Some("mac_tx"))
    );
    let _ = fs::remove_dir_all(&dir);
}
