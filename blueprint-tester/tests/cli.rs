use std::path::PathBuf;
use std::process::Command;

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "blueprint-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

const SCENE: &str = r#"{
    "title": "Plant cell",
    "zones": [{"id": "z1", "label": "Wall"}, {"id": "z1", "label": "Nucleus"}],
    "labels": [
        {"id": "wall", "text": "Wall", "correctZoneId": "z1"},
        {"id": "nucleus", "text": "Nucleus", "correctZoneId": "z1"},
        {"id": "vacuole", "text": "Vacuole", "correct_zone_id": "z3"}
    ]
}"#;

const SEQUENCE: &str = r#"{
    "sequenceId": "cells",
    "scenes": [
        {"sceneId": "overview", "blueprint": {"labels": [{"id": "a", "text": "A", "correctZoneId": "z"}]}},
        {"sceneId": "detail", "prerequisiteScene": "overview", "blueprint": {
            "mechanics": ["sequencing"],
            "sequenceConfig": {"items": [{"id": "s1"}, {"id": "s2"}, {"id": "s3"}]}
        }}
    ]
}"#;

#[test]
fn cli_checks_a_directory_and_writes_json() {
    let exe = env!("CARGO_BIN_EXE_blueprint-tester");
    let dir = temp_dir("dir");
    std::fs::write(dir.join("b_sequence.json"), SEQUENCE).unwrap();
    std::fs::write(dir.join("a_scene.json"), SCENE).unwrap();
    let report = dir.join("report.out");
    let status = Command::new(exe)
        .arg(&dir)
        .args(["--report", "json", "--points-per-zone", "5", "--output"])
        .arg(&report)
        .status()
        .expect("run cli");
    assert!(status.success());

    let content = std::fs::read_to_string(report).expect("read report");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(value["total"], 2);
    assert_eq!(value["failed"], 0);
    let documents = value["documents"].as_array().expect("documents");
    assert!(documents[0]["document"].as_str().unwrap().ends_with("a_scene.json"));
    assert_eq!(documents[0]["kind"], "scene");
    assert_eq!(documents[0]["synthesized_zones"], 1);
    assert_eq!(documents[0]["renamed_ids"], 1);
    assert_eq!(documents[0]["max_score"], 15);
    assert_eq!(documents[1]["kind"], "sequence");
    assert_eq!(documents[1]["max_score"], 5 + 15);
}

#[test]
fn cli_strict_mode_fails_on_schema_issues() {
    let exe = env!("CARGO_BIN_EXE_blueprint-tester");
    let dir = temp_dir("strict");
    let doc = dir.join("issues.json");
    std::fs::write(&doc, r#"{"zones": [{"id": "z1", "x": 140}], "labels": []}"#).unwrap();

    let lenient = Command::new(exe)
        .arg(&doc)
        .args(["--report", "markdown"])
        .output()
        .expect("run cli");
    assert!(lenient.status.success());
    let stdout = String::from_utf8_lossy(&lenient.stdout);
    assert!(stdout.contains("# Blueprint Check Results"));
    assert!(stdout.contains("zones[0].x"));

    let strict = Command::new(exe)
        .arg(&doc)
        .args(["--strict", "--report", "console"])
        .output()
        .expect("run cli");
    assert_eq!(strict.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&strict.stdout).contains("FAIL"));
}

#[test]
fn cli_reports_unreadable_documents() {
    let exe = env!("CARGO_BIN_EXE_blueprint-tester");
    let dir = temp_dir("broken");
    let doc = dir.join("broken.json");
    std::fs::write(&doc, "{ not json").unwrap();
    let output = Command::new(exe)
        .arg(&doc)
        .args(["--kind", "scene", "--report", "json"])
        .output()
        .expect("run cli");
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json on stdout");
    assert_eq!(value["documents"][0]["kind"], serde_json::Value::Null);
}

#[test]
fn cli_rejects_missing_paths() {
    let exe = env!("CARGO_BIN_EXE_blueprint-tester");
    let missing = temp_dir("missing").join("nope.json");
    let output = Command::new(exe).arg(&missing).output().expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
