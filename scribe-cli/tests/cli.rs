use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn scribe() -> Command {
    let mut cmd = Command::cargo_bin("scribe").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn java_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/main/java/com/acme/App.java",
        "package com.acme;\n\n@SpringBootApplication\npublic class App {\n    public static void main(String[] args) {}\n}\n",
    );
    write(
        dir.path(),
        "src/main/java/com/acme/pay/PaymentValidator.java",
        "package com.acme.pay;\n\npublic class PaymentValidator {\n    private PaymentGateway gateway;\n\n    public Boolean isValid(String input) {\n        return gateway.accepts(input);\n    }\n}\n",
    );
    write(
        dir.path(),
        "src/main/java/com/acme/pay/PaymentGateway.java",
        "package com.acme.pay;\n\npublic interface PaymentGateway {\n    boolean accepts(String input);\n}\n",
    );
    dir
}

#[test]
fn init_writes_config_once() {
    let project = java_project();

    scribe()
        .args(["init"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    let config = std::fs::read_to_string(project.path().join(".scribe/config.toml")).unwrap();
    assert!(config.contains("api_key_env = \"GROQ_API_KEY\""));
    assert!(config.contains("max_attempts = 5"));

    scribe()
        .args(["init"])
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    scribe()
        .args(["init", "--force"])
        .arg(project.path())
        .assert()
        .success();
}

#[test]
fn index_lists_declared_types() {
    let project = java_project();
    scribe()
        .args(["index"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("com.acme.pay.PaymentGateway"))
        .stdout(predicate::str::contains("com.acme.App"));
}

#[test]
fn plan_json_reports_strategies() {
    let project = java_project();
    let output = scribe()
        .args(["plan", "--json"])
        .arg(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files = plan["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["file"], "com/acme/App.java");
    assert_eq!(files[0]["strategy"]["strategy"], "skip");
    assert_eq!(files[0]["strategy"]["detail"], "entry_point");
    assert_eq!(files[2]["strategy"]["strategy"], "mock_dependency_strategy");
    assert_eq!(files[2]["strategy"]["detail"][0]["name"], "gateway");
}

#[test]
fn generate_without_credential_fails_closed() {
    let project = java_project();
    scribe()
        .args(["generate"])
        .arg(project.path())
        .env_remove("GROQ_API_KEY")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GROQ_API_KEY"));
    assert!(!project.path().join("src/test/java").exists());
}

#[test]
fn generate_with_blank_credential_fails_closed() {
    let project = java_project();
    scribe()
        .args(["generate"])
        .arg(project.path())
        .env("GROQ_API_KEY", "   ")
        .assert()
        .code(2);
}

#[test]
fn generate_reads_configured_key_variable() {
    let project = java_project();
    write(
        project.path(),
        ".scribe/config.toml",
        "[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\napi_key_env = \"SCRIBE_CLI_TEST_KEY\"\n",
    );
    scribe()
        .args(["generate"])
        .arg(project.path())
        .env("GROQ_API_KEY", "gsk-present-but-not-configured")
        .env_remove("SCRIBE_CLI_TEST_KEY")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SCRIBE_CLI_TEST_KEY"));
}

#[test]
fn missing_project_root_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    scribe()
        .args(["plan"])
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .code(3);
}

#[test]
fn project_without_sources_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    scribe()
        .args(["plan"])
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("source root"));
}

#[test]
fn invalid_config_exits_2() {
    let project = java_project();
    write(
        project.path(),
        ".scribe/config.toml",
        "[repair]\nmax_attempts = 0\n",
    );
    scribe()
        .args(["plan"])
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_attempts"));
}
