//! One-off job launch requests
//!
//! Renders the `CreateTrainingJob` / `CreateProcessingJob` payload a launcher
//! submits for a composed job. The request reuses the step arguments of the
//! pipeline definition, so a launched job and a pipeline-run job are
//! configured identically.

use crate::compose::definition::{ProcessingJobArguments, TrainingJobArguments};
use crate::compose::{JobSpec, PipelineKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SageMaker job names are limited to 63 characters
pub const MAX_JOB_NAME_LEN: usize = 63;
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTrainingJobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_job_name: Option<String>,
    #[serde(flatten)]
    pub arguments: TrainingJobArguments,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateProcessingJobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_job_name: Option<String>,
    #[serde(flatten)]
    pub arguments: ProcessingJobArguments,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaunchRequest {
    Training(CreateTrainingJobRequest),
    Processing(CreateProcessingJobRequest),
}

/// `<prefix>-<YYYYmmdd-HHMMSS>`, truncating the prefix to fit the limit
pub fn job_name(prefix: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let budget = MAX_JOB_NAME_LEN - stamp.len() - 1;
    let prefix: String = prefix.chars().take(budget).collect();
    format!("{}-{}", prefix.trim_end_matches('-'), stamp)
}

fn tags(job: &JobSpec, launched_by: &str, launch_time: Option<String>) -> Vec<Tag> {
    let tag = |key: &str| job.tags.get(key).cloned().unwrap_or_default();
    let mut tags = vec![
        Tag::new("Project", tag("Project")),
        Tag::new("Environment", tag("Environment")),
        Tag::new("LaunchedBy", launched_by),
    ];
    if let Some(time) = launch_time {
        tags.push(Tag::new("LaunchTime", time));
    }
    tags.push(Tag::new("ManagedBy", "sm-composer"));
    tags
}

impl LaunchRequest {
    fn build(job: &JobSpec, name: Option<String>, tags: Vec<Tag>) -> Self {
        match job.kind {
            PipelineKind::Training => Self::Training(CreateTrainingJobRequest {
                training_job_name: name,
                arguments: TrainingJobArguments::from_job(job),
                tags,
            }),
            PipelineKind::Processing => Self::Processing(CreateProcessingJobRequest {
                processing_job_name: name,
                arguments: ProcessingJobArguments::from_job(job),
                tags,
            }),
        }
    }

    /// Request for an immediate launch at `now`
    pub fn for_job(job: &JobSpec, now: DateTime<Utc>) -> Self {
        let name = job_name(&job.name, now);
        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        Self::build(job, Some(name), tags(job, "sm-composer", Some(stamp)))
    }

    /// Request without a job name or launch time; the launcher adds both when
    /// it fires.
    pub fn template(job: &JobSpec) -> Self {
        Self::build(job, None, tags(job, "scheduler", None))
    }

    pub fn kind(&self) -> PipelineKind {
        match self {
            Self::Training(_) => PipelineKind::Training,
            Self::Processing(_) => PipelineKind::Processing,
        }
    }

    pub fn job_name(&self) -> Option<&str> {
        match self {
            Self::Training(req) => req.training_job_name.as_deref(),
            Self::Processing(req) => req.processing_job_name.as_deref(),
        }
    }

    pub fn tags(&self) -> &[Tag] {
        match self {
            Self::Training(req) => &req.tags,
            Self::Processing(req) => &req.tags,
        }
    }
}

/// Event a custom launcher receives from the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchEvent {
    pub job_name_prefix: String,
    pub request: LaunchRequest,
}

impl LaunchEvent {
    pub fn for_job(job: &JobSpec) -> Self {
        Self {
            job_name_prefix: job.name.clone(),
            request: LaunchRequest::template(job),
        }
    }
}
