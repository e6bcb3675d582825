//! Launch command implementation
//!
//! Builds the request a launcher would send to start one job right away.

use super::load_plan;
use crate::compose::PipelineKind;
use crate::error::{ComposerError, ValidationError};
use crate::launch::LaunchRequest;
use crate::output::{write_output, OutputFormat};
use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run_launch_command(
    config: &Path,
    pipeline: PipelineKind,
    output: Option<PathBuf>,
) -> Result<()> {
    let plan = load_plan(config).await?;
    let composed = plan.pipeline(pipeline).ok_or_else(|| {
        let required_by = format!("launch --pipeline {}", pipeline);
        ComposerError::validation(ValidationError::dependency(pipeline.flag_name(), required_by).into())
    })?;

    let request = LaunchRequest::for_job(&composed.job, Utc::now());
    let format = output
        .as_deref()
        .map(OutputFormat::from_path)
        .unwrap_or_default();
    write_output(output.as_deref(), &format.render(&request)?).await?;

    info!(
        "Prepared {} job {}",
        request.kind(),
        request.job_name().unwrap_or_default()
    );
    Ok(())
}
