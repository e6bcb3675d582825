//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/trainer:latest";

fn sm_composer() -> Command {
    let mut cmd = Command::cargo_bin("sm-composer").unwrap();
    for key in [
        "SM_COMPOSER_ENVIRONMENT",
        "SM_COMPOSER_REGION",
        "SM_COMPOSER_ACCOUNT_ID",
        "SM_COMPOSER_SCHEDULE_ENABLED",
        "SM_COMPOSER_SCHEDULE_EXPRESSION",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn training_config(dir: &Path) -> PathBuf {
    write_config(
        dir,
        "platform.yaml",
        &format!(
            r#"
project_name: ml-platform
environment: staging
enable_training_pipeline: true
training_image_uri: "{IMAGE}"
instance_type: ml.m5.large
max_runtime_seconds: 3600
s3_bucket_arn: "arn:aws:s3:::ml-platform-staging-ml-artifacts"
"#
        ),
    )
}

fn scheduled_config(dir: &Path) -> PathBuf {
    write_config(
        dir,
        "scheduled.yaml",
        &format!(
            r#"
project_name: ml-platform
environment: staging
enable_training_pipeline: true
training_image_uri: "{IMAGE}"
enable_scheduling: true
schedule_expression: "cron(0 3 * * ? *)"
s3_bucket_arn: "arn:aws:s3:::ml-platform-staging-ml-artifacts"
"#
        ),
    )
}

#[test]
fn test_cli_help_lists_commands() {
    sm_composer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("policy"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("schedule"));
}

#[test]
fn test_invalid_command() {
    sm_composer()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_validate_success() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());

    sm_composer()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("ml-platform-staging-training"));
}

#[test]
fn test_validate_reports_every_issue() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        "broken.yaml",
        r#"
project_name: ML_Platform
environment: staging
enable_processing_pipeline: true
max_runtime_seconds: 2592001
enable_training_pipeline: true
training_image_uri: "123456789012.dkr.ecr.us-east-1.amazonaws.com/trainer:latest"
"#,
    );

    sm_composer()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .code(8)
        .stderr(predicate::str::contains("project_name"))
        .stderr(predicate::str::contains("inference_image_uri"))
        .stderr(predicate::str::contains("max_runtime_seconds"));
}

#[test]
fn test_validate_checks_schedule_expression_while_scheduling_is_off() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        "unscheduled.yaml",
        &format!(
            r#"
project_name: ml-platform
environment: staging
enable_training_pipeline: true
training_image_uri: "{IMAGE}"
schedule_expression: every day at 3
"#
        ),
    );

    sm_composer()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .code(8)
        .stderr(predicate::str::contains("[E7004 format] 'schedule_expression'"));
}

#[test]
fn test_unknown_keys_are_rejected() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        "typo.json",
        r#"{"project_name": "ml-platform", "environment": "dev", "enable_trainng": true}"#,
    );

    sm_composer()
        .args(["validate", "-c"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("enable_trainng"));
}

#[test]
fn test_missing_config_file() {
    let temp = TempDir::new().unwrap();
    sm_composer()
        .args(["validate", "-c"])
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_compose_writes_documents() {
    let temp = TempDir::new().unwrap();
    let config = scheduled_config(temp.path());
    let out = temp.path().join("out");

    sm_composer()
        .args(["compose", "-c"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Composed"));

    for file in [
        "pipelines/training.json",
        "iam/training.json",
        "iam/pipeline-execution.json",
        "iam/scheduler.json",
        "schedules/training.json",
        "plan.json",
    ] {
        assert!(out.join(file).exists(), "missing {}", file);
    }
    assert!(!out.join("pipelines/processing.json").exists());

    let definition: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("pipelines/training.json")).unwrap())
            .unwrap();
    assert_eq!(definition["Version"], "2020-12-01");
    let arguments = &definition["Steps"][0]["Arguments"];
    assert!(arguments.get("VpcConfig").is_none());
    assert_eq!(arguments["StoppingCondition"]["MaxRuntimeInSeconds"], 3600);

    let schedule: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("schedules/training.json")).unwrap())
            .unwrap();
    assert_eq!(schedule["ScheduleExpression"], "cron(0 3 * * ? *)");
    assert_eq!(schedule["State"], "DISABLED");
}

#[test]
fn test_compose_yaml_format() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());
    let out = temp.path().join("yaml-out");

    sm_composer()
        .args(["compose", "--format", "yaml", "-c"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let plan = fs::read_to_string(out.join("plan.yaml")).unwrap();
    assert!(plan.contains("project_name: ml-platform"));
}

#[test]
fn test_compose_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());
    let out = temp.path().join("dry");

    sm_composer()
        .args(["compose", "--dry-run", "-c"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("pipelines/training.json"));

    assert!(!out.exists());
}

#[test]
fn test_policy_prints_role_document() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());

    let output = sm_composer()
        .args(["policy", "--role", "training", "-c"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let policy: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(policy["Version"], "2012-10-17");
    let s3 = policy["Statement"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["Sid"] == "S3Access")
        .unwrap();
    assert!(!s3["Resource"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "*"));
}

#[test]
fn test_policy_for_absent_role_fails() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());

    sm_composer()
        .args(["policy", "--role", "scheduler", "-c"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("scheduler"));
}

#[test]
fn test_launch_training_request() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());

    let output = sm_composer()
        .args(["launch", "--pipeline", "training", "-c"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let request: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let name = request["TrainingJobName"].as_str().unwrap();
    assert!(name.starts_with("ml-platform-staging-training-"));
    assert!(name.len() <= 63);
    assert_eq!(request["AlgorithmSpecification"]["TrainingImage"], IMAGE);
    assert!(request["Tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["Key"] == "LaunchTime"));
}

#[test]
fn test_launch_disabled_pipeline_fails() {
    let temp = TempDir::new().unwrap();
    let config = training_config(temp.path());

    sm_composer()
        .args(["launch", "--pipeline", "processing", "-c"])
        .arg(&config)
        .assert()
        .code(8)
        .stderr(predicate::str::contains("enable_processing_pipeline"));
}

#[test]
fn test_schedule_set_state_in_place() {
    let temp = TempDir::new().unwrap();
    let config = scheduled_config(temp.path());
    let out = temp.path().join("out");

    sm_composer()
        .args(["compose", "-c"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let record = out.join("schedules/training.json");
    let before = fs::read_to_string(&record).unwrap();

    sm_composer()
        .args(["schedule", "set-state", "--state", "enabled"])
        .arg(&record)
        .assert()
        .success()
        .stdout(predicate::str::contains("ENABLED"));

    let after: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&record).unwrap()).unwrap();
    let before: serde_json::Value = serde_json::from_str(&before).unwrap();
    assert_eq!(after["State"], "ENABLED");
    assert_eq!(after["ScheduleExpression"], before["ScheduleExpression"]);
    assert_eq!(after["Target"], before["Target"]);

    sm_composer()
        .args(["schedule", "set-state", "--state", "enabled"])
        .arg(&record)
        .assert()
        .success()
        .stdout(predicate::str::contains("already"));
}

#[test]
fn test_schedule_set_state_rejects_other_documents() {
    let temp = TempDir::new().unwrap();
    let record = write_config(temp.path(), "not-a-schedule.json", r#"{"Version": "2012-10-17"}"#);

    sm_composer()
        .args(["schedule", "set-state", "--state", "disabled"])
        .arg(&record)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Schedule error"));
}
