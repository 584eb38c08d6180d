use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("form_schema_cli_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let file = self.path.join(name);
        fs::write(&file, contents).expect("failed to write fixture file");
        file
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_form-schema"))
        .args(args)
        .output()
        .expect("failed to run form-schema binary")
}

const SCHEMA: &str = r#"{
    "title": "Contact",
    "components": [
        {"type": "textfield", "key": "name", "label": "Name",
         "validate": {"required": true}},
        {"type": "email", "key": "email", "label": "Email"},
        {"type": "checkbox", "key": "subscribe"}
    ]
}"#;

#[test]
fn test_normalize_prints_defaulted_schema() {
    let dir = TempDir::new("normalize");
    let schema = dir.write("schema.json", SCHEMA);

    let output = run(&["normalize", schema.to_str().unwrap(), "--pretty"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["display"], "form");
    assert_eq!(parsed["components"][0]["input"], true);
    assert_eq!(parsed["components"][0]["validate"]["required"], true);
}

#[test]
fn test_defaults_prints_initial_values() {
    let dir = TempDir::new("defaults");
    let schema = dir.write("schema.json", SCHEMA);

    let output = run(&["defaults", schema.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["name"], "");
    assert_eq!(parsed["subscribe"], false);
}

#[test]
fn test_flatten_lists_components_in_order() {
    let dir = TempDir::new("flatten");
    let schema = dir.write("schema.json", SCHEMA);

    let output = run(&["flatten", schema.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let keys: Vec<&str> = stdout
        .lines()
        .map(|line| line.split('\t').next().unwrap())
        .collect();
    assert_eq!(keys, vec!["name", "email", "subscribe"]);
}

#[test]
fn test_validate_reports_errors_and_exit_code() {
    let dir = TempDir::new("validate");
    let schema = dir.write("schema.json", SCHEMA);
    let bad = dir.write("bad.json", r#"{"name": "", "email": "nope"}"#);
    let good = dir.write("good.json", r#"{"name": "Kai", "email": "kai@example.com"}"#);

    let output = run(&[
        "validate",
        schema.to_str().unwrap(),
        "--data",
        bad.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let errors: serde_json::Value =
        serde_json::from_str(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(errors[0]["key"], "name");
    assert_eq!(errors[0]["type"], "required");
    assert_eq!(errors[1]["key"], "email");

    let output = run(&[
        "validate",
        schema.to_str().unwrap(),
        "--data",
        good.to_str().unwrap(),
    ]);
    assert!(output.status.success());
}

#[test]
fn test_missing_file_reports_readable_error() {
    let output = run(&["defaults", "/nonexistent/schema.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("/nonexistent/schema.json"));
}
