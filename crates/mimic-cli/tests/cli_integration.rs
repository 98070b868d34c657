//! End-to-end tests for the `mimic` binary.
//!
//! Runs the built executable against the manifests in `tests/fixtures`.

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn mimic(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mimic"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mimic")
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "mimic failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ────────────────────────────────────────────────────────────────────────────
// inspect
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_text() {
    let out = stdout_of(&mimic(&["inspect", &fixture("greeters.toml")]));

    assert!(out.contains("module greeters v1.2.0"), "{}", out);
    assert!(out.contains("type English (module greeters)"), "{}", out);
    assert!(out.contains("greeting: string [rw]"), "{}", out);
    assert!(out.contains("total: i64 [r]"), "{}", out);
    assert!(out.contains("greet(string) -> string"), "{}", out);
    assert!(out.contains("count() -> i32"), "{}", out);
}

#[test]
fn test_inspect_json() {
    let out = stdout_of(&mimic(&["inspect", &fixture("greeters.toml"), "--json"]));
    let json: serde_json::Value = serde_json::from_str(&out).expect("inspect --json is not JSON");

    assert_eq!(json["module"], "greeters");
    assert_eq!(json["version"], "1.2.0");
    let types = json["types"].as_array().unwrap();
    let names: Vec<&str> = types.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["English", "Shouty", "Failing", "Counter"]);
    assert_eq!(types[0]["fields"][0]["type"], "string");
}

#[test]
fn test_inspect_missing_module_fails() {
    let output = mimic(&["inspect", &fixture("does-not-exist.toml")]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist.toml"));
}

// ────────────────────────────────────────────────────────────────────────────
// discover
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_discover_lists_matching_types() {
    let out = stdout_of(&mimic(&[
        "discover",
        &fixture("greeters.toml"),
        &fixture("greeter.toml"),
    ]));

    assert!(out.contains("3 plugin(s) implementing Greeter in greeters"), "{}", out);
    assert!(out.contains("found English"));
    assert!(out.contains("found Shouty"));
    assert!(out.contains("found Failing"));
    assert!(!out.contains("found Counter"));
}

#[test]
fn test_discover_run() {
    let out = stdout_of(&mimic(&[
        "discover",
        &fixture("greeters.toml"),
        &fixture("greeter.toml"),
        "--run",
        "greet",
        "--arg",
        "Ada",
    ]));

    assert!(out.contains("greet(\"Ada\")"), "{}", out);
    assert!(out.contains("English => \"Hello, Ada!\""), "{}", out);
    assert!(out.contains("Shouty => \"ADA\""), "{}", out);
    assert!(out.contains("error Failing =>"), "{}", out);
    assert!(out.contains("1 of 3 call(s) failed"), "{}", out);
}

#[test]
fn test_discover_run_parallel_keeps_order() {
    let out = stdout_of(&mimic(&[
        "discover",
        &fixture("greeters.toml"),
        &fixture("greeter.toml"),
        "--run",
        "greet",
        "--arg",
        "Ada",
        "--parallel",
    ]));

    let english = out.find("English =>").unwrap();
    let shouty = out.find("Shouty =>").unwrap();
    let failing = out.find("Failing =>").unwrap();
    assert!(english < shouty && shouty < failing, "{}", out);
}

#[test]
fn test_discover_run_undeclared_method_fails() {
    let output = mimic(&[
        "discover",
        &fixture("greeters.toml"),
        &fixture("greeter.toml"),
        "--run",
        "count",
    ]);
    assert!(!output.status.success());
}

// ────────────────────────────────────────────────────────────────────────────
// mock
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_mock_defaults() {
    let out = stdout_of(&mimic(&["mock", &fixture("counter.json")]));

    assert!(out.contains("type CounterMock (synthesized)"), "{}", out);
    assert!(out.contains("count() -> i32 => 0"), "{}", out);
    assert!(out.contains("label() -> string => \"\""), "{}", out);
    assert!(out.contains("reset(i32) -> void => null"), "{}", out);
}

#[test]
fn test_mock_returning_overrides() {
    let out = stdout_of(&mimic(&[
        "mock",
        &fixture("counter.json"),
        "--returning",
        "count=7",
        "--returning",
        "label=busy",
    ]));

    assert!(out.contains("count() -> i32 => 7"), "{}", out);
    assert!(out.contains("label() -> string => \"busy\""), "{}", out);
}

#[test]
fn test_mock_override_converts_to_declared_type() {
    let out = stdout_of(&mimic(&[
        "mock",
        &fixture("counter.json"),
        "--returning",
        "size=3",
    ]));

    assert!(out.contains("size() -> u64 => 3u64"), "{}", out);
}

#[test]
fn test_mock_unknown_override_fails() {
    let output = mimic(&["mock", &fixture("counter.json"), "--returning", "missing=1"]);
    assert!(!output.status.success());
}

#[test]
fn test_mock_with_null_text_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mimic.toml");
    std::fs::write(&config, "[synthesis]\ntext_default = \"null\"\n").unwrap();

    let out = stdout_of(&mimic(&[
        "mock",
        &fixture("counter.json"),
        "--config",
        &config.to_string_lossy(),
    ]));

    assert!(out.contains("label() -> string => null"), "{}", out);
    assert!(out.contains("ok    rename(string) -> string => null"), "{}", out);
    assert!(!out.contains("error"), "{}", out);
}
