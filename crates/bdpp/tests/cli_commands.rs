#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn bdpp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bdpp"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("bdpp should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn encode_then_decode_round_trips() {
    let encoded = bdpp(&["encode", "--stream", "5", "--kind", "print", "--data", "a\u{c0}b"]);
    assert!(encoded.status.success());
    let frame = json_lines(&encoded)[0]["frame"]
        .as_str()
        .expect("frame should be a hex string")
        .to_string();
    assert!(frame.starts_with("c0") && frame.ends_with("c0"));

    let decoded = bdpp(&["decode", &frame]);
    assert!(decoded.status.success());
    let packets = json_lines(&decoded);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0]["stream"], 5);
    assert_eq!(packets[0]["content"], "PRINT");
    assert_eq!(packets[0]["payload"], "a\u{c0}b");
}

#[test]
fn decode_of_garbage_exits_60() {
    let output = bdpp(&["decode", "c0 01 db 00 c0"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn oversized_driver_packet_exits_60() {
    let payload = "x".repeat(33);
    let output = bdpp(&["encode", "--driver", "--data", &payload]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn loopback_reports_every_message() {
    let output = bdpp(&["loopback", "--streams", "3", "--count", "2", "--size", "5000"]);
    assert!(output.status.success());
    let report = &json_lines(&output)[0];
    assert_eq!(report["messages_sent"], 6);
    assert_eq!(report["messages_received"], 6);
    assert_eq!(report["stats"]["tx_pending"], 0);
}

#[test]
fn version_prints_package_version() {
    let output = bdpp(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("bdpp {}", env!("CARGO_PKG_VERSION"))));
}
