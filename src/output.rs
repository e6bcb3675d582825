//! Rendering composed documents to files or stdout

use crate::error::{ComposerError, ErrorCode, Result};
use crate::plan::Plan;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Format implied by a file extension; anything but `.yaml`/`.yml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    pub fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        let rendered = match self {
            Self::Json => serde_json::to_string_pretty(value)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| ComposerError::serialization("JSON document", e))?,
            Self::Yaml => serde_yaml::to_string(value)
                .map_err(|e| ComposerError::serialization("YAML document", e))?,
        };
        Ok(rendered)
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        let value = match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(value)
    }
}

/// A document and the path, relative to the output directory, it belongs at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Lay out every document of `plan`:
/// `pipelines/<kind>`, `iam/<role>`, `schedules/<kind>` and `plan`
pub fn render_plan(plan: &Plan, format: OutputFormat) -> Result<Vec<RenderedFile>> {
    let ext = format.extension();
    let mut files = Vec::new();

    for pipeline in &plan.pipelines {
        files.push(RenderedFile {
            path: PathBuf::from("pipelines").join(format!("{}.{}", pipeline.kind(), ext)),
            contents: format.render(&pipeline.definition)?,
        });
    }
    for role in &plan.policies.roles {
        files.push(RenderedFile {
            path: PathBuf::from("iam").join(format!("{}.{}", role.role, ext)),
            contents: format.render(role)?,
        });
    }
    for schedule in &plan.schedules {
        files.push(RenderedFile {
            path: PathBuf::from("schedules").join(format!("{}.{}", schedule.kind(), ext)),
            contents: format.render(&schedule.to_rule_document()?)?,
        });
    }
    files.push(RenderedFile {
        path: PathBuf::from(format!("plan.{}", ext)),
        contents: format.render(&plan.summary())?,
    });
    Ok(files)
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> ComposerError {
    ComposerError::storage_with_code(
        ErrorCode::STORAGE_IO_ERROR,
        format!("Failed to {} {}", action, path.display()),
        Some(path.to_path_buf()),
    )
    .with_source(err)
}

/// Write `files` under `dir`, creating directories as needed
pub async fn write_files(dir: &Path, files: &[RenderedFile]) -> Result<()> {
    for file in files {
        let target = dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create directory", parent, e))?;
        }
        fs::write(&target, &file.contents)
            .await
            .map_err(|e| storage_error("write", &target, e))?;
        debug!("Wrote {}", target.display());
    }
    info!("Wrote {} file(s) to {}", files.len(), dir.display());
    Ok(())
}

/// Write to `path`, or print to stdout when there is none
pub async fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| storage_error("create directory", parent, e))?;
            }
            fs::write(path, contents)
                .await
                .map_err(|e| storage_error("write", path, e))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", contents),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformInput;
    use crate::plan::build_plan;
    use tempfile::TempDir;

    fn plan() -> Plan {
        let mut input = PlatformInput::new("ml-platform", "staging");
        input.enable_training_pipeline = true;
        input.training_image_uri =
            Some("123.dkr.ecr.us-east-1.amazonaws.com/img:latest".to_string());
        input.enable_scheduling = true;
        input.schedule_expression = Some("rate(1 day)".to_string());
        build_plan(&input).unwrap()
    }

    #[test]
    fn test_render_plan_layout() {
        let files = render_plan(&plan(), OutputFormat::Json).unwrap();
        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec![
                "pipelines/training.json",
                "iam/training.json",
                "iam/pipeline-execution.json",
                "iam/scheduler.json",
                "schedules/training.json",
                "plan.json",
            ]
        );
    }

    #[test]
    fn test_yaml_rendering() {
        let files = render_plan(&plan(), OutputFormat::Yaml).unwrap();
        let definition = files
            .iter()
            .find(|f| f.path.ends_with("training.yaml") && f.path.starts_with("pipelines"))
            .unwrap();
        assert!(definition.contents.contains("Version: 2020-12-01"));
    }

    #[test]
    fn test_unserializable_document_is_storage_error() {
        let keyed_by_pair = std::collections::BTreeMap::from([((1u8, 2u8), "x")]);
        let err = OutputFormat::Json.render(&keyed_by_pair).unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_SERIALIZATION_ERROR);
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("a.yml")), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_path(Path::new("a.json")), OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_write_files() {
        let dir = TempDir::new().unwrap();
        let files = render_plan(&plan(), OutputFormat::Json).unwrap();
        write_files(dir.path(), &files).await.unwrap();
        assert!(dir.path().join("pipelines/training.json").exists());
        assert!(dir.path().join("plan.json").exists());

        let written = std::fs::read_to_string(dir.path().join("plan.json")).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(summary["project_name"], "ml-platform");
    }

    #[tokio::test]
    async fn test_write_output_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requests/training.json");
        write_output(Some(&path), "{}\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}\n");
    }
}
