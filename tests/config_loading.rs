use std::error::Error;
use std::fs;
use std::path::PathBuf;

use stackctl::config::{load_and_validate, load_from_path};
use stackctl::errors::StackctlError;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<(tempfile::TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Stackctl.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn full_config_parses_with_all_fields() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
interpreter = "python3"
entry = "app/main.py"
workdir = "backend"
settle_delay_ms = 500
log_dir = "logs"

[server.env]
PYTHONIOENCODING = "utf-8"

[tool.reporter]
port = 8710
cmd = "npx serve reports -l 8710"

[build]
lock_file = ".stackctl/build.lock"
required_tools = ["poetry", "npm"]
pin_package = "httpx"
pin_version = "0.24.1"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.server.entry, "app/main.py");
    assert_eq!(cfg.server.settle_delay_ms, 500);
    assert_eq!(
        cfg.server.env.get("PYTHONIOENCODING").map(String::as_str),
        Some("utf-8")
    );
    assert_eq!(cfg.tool.len(), 1);
    assert_eq!(cfg.tool["reporter"].port, 8710);
    assert_eq!(cfg.build.pin_package.as_deref(), Some("httpx"));
    Ok(())
}

#[test]
fn minimal_config_gets_defaults() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.server.interpreter, "python3");
    assert_eq!(cfg.server.workdir, ".");
    assert_eq!(cfg.server.settle_delay_ms, 2000);
    assert_eq!(cfg.server.log_dir, "logs");
    assert!(cfg.tool.is_empty());
    assert_eq!(cfg.build.lock_file, ".stackctl/build.lock");
    assert_eq!(cfg.build.required_tools, vec!["poetry", "npm"]);
    assert!(cfg.build.pin_package.is_none());
    Ok(())
}

#[test]
fn missing_entry_is_rejected() -> TestResult {
    let (_dir, path) = write_config("[server]\ninterpreter = \"python3\"\n")?;

    // Deserialization alone accepts it; validation rejects it.
    assert!(load_from_path(&path).is_ok());
    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("entry")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn zero_settle_delay_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"
settle_delay_ms = 0
"#,
    )?;

    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("settle_delay_ms")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn duplicate_tool_ports_are_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"

[tool.a]
port = 8710
cmd = "run-a"

[tool.b]
port = 8710
cmd = "run-b"
"#,
    )?;

    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("8710")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn tool_without_command_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"

[tool.a]
port = 8710
"#,
    )?;

    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("cmd")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn pin_package_without_version_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"

[build]
pin_package = "httpx"
"#,
    )?;

    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("pin_")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn dist_equal_to_deploy_dir_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[server]
entry = "app/main.py"

[build]
frontend_dist = "frontend/dist"
deploy_dir = "frontend/dist"
"#,
    )?;

    match load_and_validate(&path) {
        Err(StackctlError::ConfigError(msg)) => assert!(msg.contains("deploy_dir")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn invalid_toml_reports_a_parse_error() -> TestResult {
    let (_dir, path) = write_config("[server\nentry = ")?;

    match load_from_path(&path) {
        Err(StackctlError::TomlError(_)) => {}
        other => panic!("expected TomlError, got {other:?}"),
    }
    Ok(())
}
