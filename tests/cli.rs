use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/classes")
}

fn copy_tree(from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

fn run_json(args: &[&str], envs: &[(&str, &str)]) -> anyhow::Result<Value> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_no-more-finals"));
    cmd.args(args).env_remove("NO_MORE_FINALS_CONFIG");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let out = cmd.output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[test]
fn run_with_config_file_reports_json() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    copy_tree(&fixtures(), &input)?;
    std::fs::write(input.join("readme.txt"), "resource")?;

    let config = dir.path().join("rules.json");
    std::fs::write(
        &config,
        r#"{"packages": ["com.example"], "includeSubpackages": true,
            "excludedPackages": ["com.example.internal"]}"#,
    )?;

    let report = run_json(
        &[
            "--config",
            config.to_string_lossy().as_ref(),
            "run",
            input.to_string_lossy().as_ref(),
            output.to_string_lossy().as_ref(),
        ],
        &[],
    )?;
    assert_eq!(report["transformed_classes"], Value::from(3));
    assert_eq!(report["untouched_classes"], Value::from(2));
    assert_eq!(report["copied_files"], Value::from(1));
    assert_eq!(report["fallback_classes"], Value::from(0));

    let inspected = run_json(
        &[
            "inspect",
            output
                .join("com/example/internal/Foo.class")
                .to_string_lossy()
                .as_ref(),
        ],
        &[],
    )?;
    assert_eq!(inspected["name"], Value::from("com.example.internal.Foo"));
    assert_eq!(inspected["is_final"], Value::Bool(true));
    Ok(())
}

#[test]
fn implicit_run_with_flags_and_env_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    copy_tree(&fixtures(), &input)?;

    let config = dir.path().join("env-rules.json");
    std::fs::write(&config, r#"{"excludedClasses": ["com.example.Widget"]}"#)?;

    let report = run_json(
        &[
            input.to_string_lossy().as_ref(),
            output.to_string_lossy().as_ref(),
            "--class",
            "com.example.Widget",
            "--class",
            "com.other.Baz",
            "--parallel",
        ],
        &[("NO_MORE_FINALS_CONFIG", config.to_string_lossy().as_ref())],
    )?;
    assert_eq!(report["transformed_classes"], Value::from(1));
    assert_eq!(
        report["transformed"][0]["class_name"],
        Value::from("com.other.Baz")
    );
    assert_eq!(
        report["transformed"][0]["methods"][0],
        Value::from("area(D)D")
    );

    let widget = run_json(
        &[
            "inspect",
            output
                .join("com/example/Widget.class")
                .to_string_lossy()
                .as_ref(),
        ],
        &[],
    )?;
    assert_eq!(widget["is_final"], Value::Bool(true));
    assert_eq!(widget["methods"][1]["modifiers"], serde_json::json!(["public", "final"]));
    Ok(())
}

#[test]
fn inspect_rejects_non_class_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let bogus = dir.path().join("Bogus.class");
    std::fs::write(&bogus, "nope")?;

    let out = Command::new(env!("CARGO_BIN_EXE_no-more-finals"))
        .args(["inspect", bogus.to_string_lossy().as_ref()])
        .output()?;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to parse class file"));
    Ok(())
}
