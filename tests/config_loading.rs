// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

use jobdag::config::{default_config_path, load_and_validate, load_from_path, parse_duration};
use jobdag::errors::JobdagError;

type TestResult = Result<(), Box<dyn Error>>;

fn write_job_file(contents: &str) -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("Jobdag.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn valid_file_builds_the_dependency_graph() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[config]
timeout = "30s"
fail_fast = true

[job.fetch]
cmd = "echo fetch"

[job.transform]
cmd = "echo transform"
after = ["fetch"]

[job.report]
cmd = "echo report"
after = ["fetch", "transform"]
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(cfg.config.fail_fast);
    assert_eq!(cfg.timeout()?, Some(Duration::from_secs(30)));
    assert_eq!(cfg.command_of("transform"), Some("echo transform"));
    assert_eq!(cfg.command_of("missing"), None);

    let graph = cfg.graph();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.roots().cloned().collect::<Vec<_>>(), vec!["fetch".to_string()]);
    assert_eq!(graph.in_degree(&"report".to_string()), 2);
    Ok(())
}

#[test]
fn config_section_is_optional() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[job.only]
cmd = "true"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(!cfg.config.fail_fast);
    assert_eq!(cfg.timeout()?, None);
    Ok(())
}

#[test]
fn cycle_is_rejected() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[job.a]
cmd = "true"
after = ["b"]

[job.b]
cmd = "true"
after = ["a"]
"#,
    )?;

    match load_and_validate(&path) {
        Err(JobdagError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
        other => panic!("expected DagCycle, got {:?}", other),
    }
    Ok(())
}

#[test]
fn unknown_dependency_is_rejected() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[job.a]
cmd = "true"
after = ["ghost"]
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, JobdagError::ConfigError(_)));
    assert!(err.to_string().contains("unknown dependency 'ghost'"));
    Ok(())
}

#[test]
fn self_dependency_is_rejected() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[job.a]
cmd = "true"
after = ["a"]
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("cannot depend on itself"));
    Ok(())
}

#[test]
fn file_without_jobs_is_rejected() -> TestResult {
    let (_dir, path) = write_job_file("[config]\nfail_fast = true\n")?;

    // Parses fine, fails validation.
    let raw = load_from_path(&path)?;
    assert!(raw.job.is_empty());

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, JobdagError::ConfigError(_)));
    Ok(())
}

#[test]
fn bad_timeout_is_rejected() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[config]
timeout = "10 parsecs"

[job.a]
cmd = "true"
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("[config].timeout is invalid"));
    Ok(())
}

#[test]
fn malformed_toml_and_missing_files_surface_their_own_errors() -> TestResult {
    let (dir, path) = write_job_file("[job.a\ncmd = ")?;
    assert!(matches!(load_and_validate(&path), Err(JobdagError::TomlError(_))));

    let missing = dir.path().join("nope.toml");
    assert!(matches!(load_and_validate(&missing), Err(JobdagError::IoError(_))));
    Ok(())
}

#[test]
fn missing_cmd_is_a_parse_error() -> TestResult {
    let (_dir, path) = write_job_file("[job.a]\nafter = []\n")?;
    assert!(matches!(load_from_path(&path), Err(JobdagError::TomlError(_))));
    Ok(())
}

#[test]
fn default_path_is_in_the_working_directory() {
    assert_eq!(default_config_path(), PathBuf::from("Jobdag.toml"));
}

#[test]
fn overflowing_timeout_is_a_config_error() -> TestResult {
    let (_dir, path) = write_job_file(
        r#"
[config]
timeout = "6000000000000000000h"

[job.a]
cmd = "true"
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, JobdagError::ConfigError(_)));
    assert!(err.to_string().contains("too large"));
    Ok(())
}

#[test]
fn duration_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1H"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("15").is_err());
    assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
}

proptest! {
    #[test]
    fn millisecond_durations_parse_exactly(n in 0u64..1_000_000) {
        let parsed = parse_duration(&format!("{n}ms")).unwrap();
        prop_assert_eq!(parsed, Duration::from_millis(n));
    }

    #[test]
    fn hour_durations_never_panic(n in any::<u64>()) {
        let parsed = parse_duration(&format!("{n}h"));
        match n.checked_mul(3600) {
            Some(secs) => prop_assert_eq!(parsed, Ok(Duration::from_secs(secs))),
            None => prop_assert!(parsed.is_err()),
        }
    }
}
