//! Pipeline definition composer
//!
//! Builds one [`JobSpec`] and its [`PipelineDefinition`] per enabled pipeline
//! kind. Composition only produces documents; nothing is submitted.

pub mod definition;
pub mod job_spec;
pub mod processing;
pub mod training;

pub use definition::{PipelineDefinition, StepArguments};
pub use job_spec::{Channel, JobSpec, PipelineKind, SpotConfig, VpcConfig, DEFAULT_CONTENT_TYPE};

use crate::config::{ProjectContext, ResolvedConfig};
use crate::error::{collect_into, validated, ComposeValidation, ValidationError};
use stillwater::Validation;
use crate::features::{MlflowGroup, ResourceGroups, VpcGroup};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A composed job together with the definition that carries it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPipeline {
    pub pipeline_name: String,
    pub pipeline_arn: String,
    pub job: JobSpec,
    pub definition: PipelineDefinition,
}

impl ComposedPipeline {
    fn new(context: &ProjectContext, job: JobSpec) -> Self {
        let pipeline_name = pipeline_name(context, job.kind);
        let pipeline_arn = context.arn("sagemaker", &format!("pipeline/{}", pipeline_name));
        let definition = PipelineDefinition::from_job(pipeline_name.clone(), &job);
        Self {
            pipeline_name,
            pipeline_arn,
            job,
            definition,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.job.kind
    }
}

/// `{project}-{environment}-{kind}`
pub fn pipeline_name(context: &ProjectContext, kind: PipelineKind) -> String {
    context.resource_name(kind.as_str())
}

pub(crate) fn check_range(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: u64,
    min: u64,
    max: u64,
) {
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::range(field, value, min, max));
    }
}

/// Reserved variables every job receives
pub(crate) fn base_environment(context: &ProjectContext) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("AWS_DEFAULT_REGION".to_string(), context.region.clone()),
        ("ENVIRONMENT".to_string(), context.environment.to_string()),
        ("PROJECT_NAME".to_string(), context.project_name.clone()),
    ])
}

pub(crate) fn mlflow_environment(mlflow: Option<&MlflowGroup>) -> BTreeMap<String, String> {
    mlflow
        .map(|m| BTreeMap::from([("MLFLOW_TRACKING_URI".to_string(), m.tracking_uri.clone())]))
        .unwrap_or_default()
}

pub(crate) fn vpc_config(vpc: Option<&VpcGroup>) -> Option<VpcConfig> {
    vpc.map(|v| VpcConfig {
        subnets: v.subnet_ids(),
        security_groups: v.security_group_ids(),
    })
}

/// Compose the pipeline for one kind; the kind's group must exist
pub fn compose_kind(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
    kind: PipelineKind,
) -> ComposeValidation<ComposedPipeline> {
    let job = match (kind, &groups.training, &groups.processing) {
        (PipelineKind::Training, Some(group), _) => {
            training::compose_training(resolved, group, groups)
        }
        (PipelineKind::Processing, _, Some(group)) => {
            processing::compose_processing(resolved, group, groups)
        }
        _ => Validation::failure(vec![not_enabled(kind)]),
    };
    match job {
        Validation::Success(job) => {
            debug!("Composed {} job {}", kind, job.name);
            Validation::success(ComposedPipeline::new(&resolved.context, job))
        }
        Validation::Failure(errors) => Validation::failure(errors),
    }
}

fn not_enabled(kind: PipelineKind) -> ValidationError {
    ValidationError::dependency(
        kind.flag_name(),
        format!("the {} pipeline is requested", kind),
    )
}

/// Compose every enabled kind, reporting the errors of all of them together
pub fn compose_all(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
) -> ComposeValidation<Vec<ComposedPipeline>> {
    let mut errors = Vec::new();
    let composed: Vec<ComposedPipeline> = groups
        .enabled_kinds()
        .into_iter()
        .filter_map(|kind| collect_into(&mut errors, compose_kind(resolved, groups, kind)))
        .collect();
    validated(composed, errors)
}
