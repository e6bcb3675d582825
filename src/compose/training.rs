//! Training job composition

use super::job_spec::{channel_env_key, merge_reserved, Channel, JobSpec, PipelineKind, SpotConfig};
use super::{base_environment, check_range, mlflow_environment, vpc_config, DEFAULT_CONTENT_TYPE};
use crate::config::patterns::bucket_from_arn;
use crate::config::ResolvedConfig;
use crate::error::{validated, ComposeValidation};
use crate::features::{ResourceGroups, TrainingGroup};
use crate::iam::RoleKind;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 3600;
/// 30 days
pub const MAX_RUNTIME_CEILING: u64 = 2_592_000;
pub const MAX_INSTANCE_COUNT: u64 = 100;
pub const MAX_VOLUME_SIZE_GB: u64 = 16_384;
pub const MAX_HYPERPARAMETERS: u64 = 100;

pub const MODEL_DIR: &str = "/opt/ml/model";
pub const OUTPUT_DATA_DIR: &str = "/opt/ml/output/data";
const CHANNEL_ROOT: &str = "/opt/ml/input/data";

/// Output path used when none is configured: `s3://<bucket>/models/`
pub fn default_output_path(resolved: &ResolvedConfig) -> String {
    let bucket = resolved
        .references
        .bucket
        .as_ref()
        .and_then(|b| bucket_from_arn(b.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| resolved.context.default_bucket());
    format!("s3://{}/models/", bucket)
}

fn reserved_environment(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
    channels: &[Channel],
) -> BTreeMap<String, String> {
    let mut reserved = BTreeMap::from([
        ("SM_MODEL_DIR".to_string(), MODEL_DIR.to_string()),
        ("SM_OUTPUT_DATA_DIR".to_string(), OUTPUT_DATA_DIR.to_string()),
    ]);
    for channel in channels {
        reserved.insert(
            channel_env_key(&channel.name),
            format!("{}/{}", CHANNEL_ROOT, channel.name),
        );
    }
    reserved.extend(base_environment(&resolved.context));
    reserved.extend(mlflow_environment(groups.mlflow.as_ref()));
    reserved
}

pub fn compose_training(
    resolved: &ResolvedConfig,
    group: &TrainingGroup,
    groups: &ResourceGroups,
) -> ComposeValidation<JobSpec> {
    let context = &resolved.context;
    let settings = &resolved.settings.training;
    let mut errors = Vec::new();

    let max_runtime_seconds = settings
        .max_runtime_seconds
        .unwrap_or(DEFAULT_MAX_RUNTIME_SECONDS);
    check_range(
        &mut errors,
        "max_runtime_seconds",
        max_runtime_seconds,
        1,
        MAX_RUNTIME_CEILING,
    );
    check_range(
        &mut errors,
        "instance_count",
        u64::from(settings.instance_count),
        1,
        MAX_INSTANCE_COUNT,
    );
    check_range(
        &mut errors,
        "volume_size_gb",
        u64::from(settings.volume_size_gb),
        1,
        MAX_VOLUME_SIZE_GB,
    );
    check_range(
        &mut errors,
        "hyperparameters",
        settings.hyperparameters.len() as u64,
        0,
        MAX_HYPERPARAMETERS,
    );

    let output_path = resolved
        .references
        .training_output
        .as_ref()
        .map(|r| r.identifier.clone())
        .unwrap_or_else(|| default_output_path(resolved));

    let spot = groups.spot.as_ref().map(|spot| {
        let max_wait_seconds = spot
            .max_wait_time_seconds
            .unwrap_or_else(|| (max_runtime_seconds.saturating_mul(2)).min(MAX_RUNTIME_CEILING));
        check_range(
            &mut errors,
            "max_wait_time_seconds",
            max_wait_seconds,
            max_runtime_seconds,
            MAX_RUNTIME_CEILING,
        );
        SpotConfig {
            max_wait_seconds,
            checkpoint_s3_uri: resolved
                .references
                .checkpoint
                .as_ref()
                .map(|r| r.identifier.clone())
                .unwrap_or_else(|| format!("{}/checkpoints/", output_path.trim_end_matches('/'))),
        }
    });

    let input_channels: Vec<Channel> = settings
        .input_channels
        .iter()
        .map(|c| Channel {
            name: c.name.clone(),
            s3_uri: c.s3_uri.clone(),
            content_type: c
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
        .collect();

    let environment_variables = merge_reserved(
        PipelineKind::Training,
        "environment",
        &settings.environment_variables,
        reserved_environment(resolved, groups, &input_channels),
    );
    let hyperparameters = merge_reserved(
        PipelineKind::Training,
        "hyperparameters",
        &settings.hyperparameters,
        BTreeMap::from([("sagemaker_region".to_string(), context.region.clone())]),
    );

    let mut tags = context.tags();
    tags.insert("Type".to_string(), PipelineKind::Training.to_string());

    let job = JobSpec {
        kind: PipelineKind::Training,
        name: context.resource_name(PipelineKind::Training.as_str()),
        image_uri: group.image.identifier.clone(),
        role_arn: RoleKind::Training.arn(context),
        instance_type: settings.instance_type.clone(),
        instance_count: settings.instance_count,
        volume_size_gb: settings.volume_size_gb,
        max_runtime_seconds,
        input_channels,
        output_path,
        hyperparameters,
        environment_variables,
        vpc_config: vpc_config(groups.vpc.as_ref()),
        network_isolation: groups.network_isolation,
        spot,
        kms_key_id: resolved.references.kms_key.as_ref().map(|k| k.identifier.clone()),
        tags,
    };
    validated(job, errors)
}
