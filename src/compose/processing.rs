//! Processing (batch inference) job composition

use super::job_spec::{merge_reserved, Channel, JobSpec, PipelineKind};
use super::{base_environment, check_range, mlflow_environment, vpc_config, DEFAULT_CONTENT_TYPE};
use crate::config::ResolvedConfig;
use crate::error::{validated, ComposeValidation};
use crate::features::{ProcessingGroup, ResourceGroups};
use crate::iam::RoleKind;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 1800;
/// 7 days
pub const MAX_RUNTIME_CEILING: u64 = 604_800;

pub const INPUT_DIR: &str = "/opt/ml/processing/input";
pub const OUTPUT_DIR: &str = "/opt/ml/processing/output";

fn reserved_environment(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
) -> BTreeMap<String, String> {
    let mut reserved = BTreeMap::from([
        ("SM_PROCESSING_INPUT_DIR".to_string(), INPUT_DIR.to_string()),
        ("SM_PROCESSING_OUTPUT_DIR".to_string(), OUTPUT_DIR.to_string()),
    ]);
    reserved.extend(base_environment(&resolved.context));
    reserved.extend(mlflow_environment(groups.mlflow.as_ref()));
    if let Some(kafka) = &resolved.settings.processing.kafka {
        reserved.insert(
            "KAFKA_BOOTSTRAP_SERVERS".to_string(),
            kafka.bootstrap_servers.clone(),
        );
        reserved.insert("KAFKA_TOPIC".to_string(), kafka.topic.clone());
        reserved.insert(
            "KAFKA_SECURITY_PROTOCOL".to_string(),
            kafka.security_protocol.clone(),
        );
    }
    reserved
}

pub fn compose_processing(
    resolved: &ResolvedConfig,
    group: &ProcessingGroup,
    groups: &ResourceGroups,
) -> ComposeValidation<JobSpec> {
    let context = &resolved.context;
    let settings = &resolved.settings.processing;
    let mut errors = Vec::new();

    let max_runtime_seconds = settings
        .max_runtime_seconds
        .unwrap_or(DEFAULT_MAX_RUNTIME_SECONDS);
    check_range(
        &mut errors,
        "processing_max_runtime_seconds",
        max_runtime_seconds,
        1,
        MAX_RUNTIME_CEILING,
    );
    check_range(
        &mut errors,
        "processing_instance_count",
        u64::from(settings.instance_count),
        1,
        super::training::MAX_INSTANCE_COUNT,
    );
    check_range(
        &mut errors,
        "processing_volume_size_gb",
        u64::from(settings.volume_size_gb),
        1,
        super::training::MAX_VOLUME_SIZE_GB,
    );

    let environment_variables = merge_reserved(
        PipelineKind::Processing,
        "environment",
        &settings.environment_variables,
        reserved_environment(resolved, groups),
    );

    let mut tags = context.tags();
    tags.insert("Type".to_string(), PipelineKind::Processing.to_string());

    let job = JobSpec {
        kind: PipelineKind::Processing,
        name: context.resource_name(PipelineKind::Processing.as_str()),
        image_uri: group.image.identifier.clone(),
        role_arn: RoleKind::Processing.arn(context),
        instance_type: settings.instance_type.clone(),
        instance_count: settings.instance_count,
        volume_size_gb: settings.volume_size_gb,
        max_runtime_seconds,
        input_channels: vec![Channel {
            name: "input".to_string(),
            s3_uri: group.input.identifier.clone(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }],
        output_path: group.output.identifier.clone(),
        hyperparameters: BTreeMap::new(),
        environment_variables,
        vpc_config: vpc_config(groups.vpc.as_ref()),
        network_isolation: groups.network_isolation,
        spot: None,
        kms_key_id: resolved.references.kms_key.as_ref().map(|k| k.identifier.clone()),
        tags,
    };
    validated(job, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, PlatformInput};
    use crate::error::ValidationErrors;
    use crate::features::evaluate;

    fn processing_input() -> PlatformInput {
        let mut input = PlatformInput::new("ml-platform", "prod");
        input.enable_processing_pipeline = true;
        input.inference_image_uri =
            Some("123456789012.dkr.ecr.us-east-1.amazonaws.com/infer:1.2".to_string());
        input.inference_input_s3_path = Some("s3://data/inference/input/".to_string());
        input.inference_output_s3_path = Some("s3://data/inference/output/".to_string());
        input
    }

    fn compose(input: &PlatformInput) -> Result<JobSpec, ValidationErrors> {
        let resolved = resolve(input).into_result().unwrap();
        let groups = evaluate(&resolved).into_result().unwrap();
        compose_processing(&resolved, groups.processing.as_ref().unwrap(), &groups)
            .into_result()
            .map_err(ValidationErrors::from)
    }

    #[test]
    fn test_processing_job_defaults() {
        let job = compose(&processing_input()).unwrap();
        assert_eq!(job.name, "ml-platform-prod-processing");
        assert_eq!(job.max_runtime_seconds, DEFAULT_MAX_RUNTIME_SECONDS);
        assert_eq!(job.input_channels[0].s3_uri, "s3://data/inference/input/");
        assert_eq!(job.output_path, "s3://data/inference/output/");
        assert_eq!(job.environment_variables["SM_PROCESSING_INPUT_DIR"], INPUT_DIR);
        assert!(!job.environment_variables.contains_key("KAFKA_TOPIC"));
        assert!(job.hyperparameters.is_empty());
        assert_eq!(
            job.role_arn,
            "arn:aws:iam::123456789012:role/ml-platform-prod-processing-role"
        );
    }

    #[test]
    fn test_processing_runtime_ceiling() {
        let mut input = processing_input();
        input.processing_max_runtime_seconds = Some(604_800);
        assert!(compose(&input).is_ok());
        input.processing_max_runtime_seconds = Some(604_801);
        assert!(compose(&input)
            .unwrap_err()
            .mentions("processing_max_runtime_seconds"));
    }

    #[test]
    fn test_kafka_variables_are_reserved() {
        let mut input = processing_input();
        input.kafka_bootstrap_servers = Some("b-1.msk.local:9096".to_string());
        input
            .processing_environment_variables
            .insert("KAFKA_TOPIC".to_string(), "mine".to_string());
        input
            .processing_environment_variables
            .insert("BATCH_SIZE".to_string(), "1000".to_string());
        let env = compose(&input).unwrap().environment_variables;
        assert_eq!(env["KAFKA_TOPIC"], "ml-predictions-prod");
        assert_eq!(env["KAFKA_BOOTSTRAP_SERVERS"], "b-1.msk.local:9096");
        assert_eq!(env["KAFKA_SECURITY_PROTOCOL"], "SASL_SSL");
        assert_eq!(env["BATCH_SIZE"], "1000");
    }

    #[test]
    fn test_network_isolation_flag() {
        let mut input = processing_input();
        input.enable_network_isolation = true;
        assert!(compose(&input).unwrap().network_isolation);
    }
}
