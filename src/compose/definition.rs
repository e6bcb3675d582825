//! SageMaker pipeline definition documents
//!
//! The argument structs mirror the `CreateTrainingJob` and
//! `CreateProcessingJob` request shapes. Optional blocks are omitted from the
//! serialized form rather than written as `null`, and every value needed to
//! rebuild the [`JobSpec`] is carried, so [`JobSpec::from_definition`] is an
//! exact inverse of [`PipelineDefinition::from_job`].

use super::job_spec::{Channel, JobSpec, PipelineKind, SpotConfig, VpcConfig};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFINITION_VERSION: &str = "2020-12-01";

const PROCESSING_INPUT_PATH: &str = "/opt/ml/processing/input";
const PROCESSING_OUTPUT_PATH: &str = "/opt/ml/processing/output";

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineDefinition {
    pub version: String,
    pub metadata: DefinitionMetadata,
    pub parameters: Vec<PipelineParameter>,
    pub steps: Vec<PipelineStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefinitionMetadata {
    pub pipeline_name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineParameter {
    pub name: String,
    #[serde(rename = "Type")]
    pub parameter_type: String,
    pub default_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineStep {
    pub name: String,
    #[serde(rename = "Type")]
    pub step_type: String,
    pub arguments: StepArguments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepArguments {
    Training(TrainingJobArguments),
    Processing(ProcessingJobArguments),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfigDocument {
    pub security_group_ids: Vec<String>,
    pub subnets: Vec<String>,
}

impl From<&VpcConfig> for VpcConfigDocument {
    fn from(vpc: &VpcConfig) -> Self {
        Self {
            security_group_ids: vpc.security_groups.clone(),
            subnets: vpc.subnets.clone(),
        }
    }
}

impl From<VpcConfigDocument> for VpcConfig {
    fn from(doc: VpcConfigDocument) -> Self {
        Self {
            subnets: doc.subnets,
            security_groups: doc.security_group_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoppingCondition {
    pub max_runtime_in_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_time_in_seconds: Option<u64>,
}

// Training

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmSpecification {
    pub training_image: String,
    pub training_input_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    pub s3_data_type: String,
    pub s3_uri: String,
    pub s3_data_distribution_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub s3_data_source: S3DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingChannel {
    pub channel_name: String,
    pub data_source: DataSource,
    pub content_type: String,
    pub input_mode: String,
}

impl From<&Channel> for TrainingChannel {
    fn from(channel: &Channel) -> Self {
        Self {
            channel_name: channel.name.clone(),
            data_source: DataSource {
                s3_data_source: S3DataSource {
                    s3_data_type: "S3Prefix".to_string(),
                    s3_uri: channel.s3_uri.clone(),
                    s3_data_distribution_type: "FullyReplicated".to_string(),
                },
            },
            content_type: channel.content_type.clone(),
            input_mode: "File".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    pub s3_output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceConfig {
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckpointConfig {
    pub s3_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingJobArguments {
    pub algorithm_specification: AlgorithmSpecification,
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_data_config: Vec<TrainingChannel>,
    pub output_data_config: OutputDataConfig,
    pub resource_config: ResourceConfig,
    pub stopping_condition: StoppingCondition,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hyper_parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfigDocument>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_network_isolation: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_managed_spot_training: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_config: Option<CheckpointConfig>,
}

impl TrainingJobArguments {
    pub fn from_job(job: &JobSpec) -> Self {
        Self {
            algorithm_specification: AlgorithmSpecification {
                training_image: job.image_uri.clone(),
                training_input_mode: "File".to_string(),
            },
            role_arn: job.role_arn.clone(),
            input_data_config: job.input_channels.iter().map(TrainingChannel::from).collect(),
            output_data_config: OutputDataConfig {
                s3_output_path: job.output_path.clone(),
                kms_key_id: job.kms_key_id.clone(),
            },
            resource_config: ResourceConfig {
                instance_type: job.instance_type.clone(),
                instance_count: job.instance_count,
                volume_size_in_gb: job.volume_size_gb,
                volume_kms_key_id: job.kms_key_id.clone(),
            },
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: job.max_runtime_seconds,
                max_wait_time_in_seconds: job.spot.as_ref().map(|s| s.max_wait_seconds),
            },
            hyper_parameters: job.hyperparameters.clone(),
            environment: job.environment_variables.clone(),
            vpc_config: job.vpc_config.as_ref().map(VpcConfigDocument::from),
            enable_network_isolation: job.network_isolation,
            enable_managed_spot_training: job.spot.is_some(),
            checkpoint_config: job.spot.as_ref().map(|s| CheckpointConfig {
                s3_uri: s.checkpoint_s3_uri.clone(),
            }),
        }
    }
}

// Processing

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppSpecification {
    pub image_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Input {
    pub s3_uri: String,
    pub local_path: String,
    pub s3_data_type: String,
    pub s3_input_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingInput {
    pub input_name: String,
    pub s3_input: S3Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Output {
    pub s3_uri: String,
    pub local_path: String,
    pub s3_upload_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutput {
    pub output_name: String,
    pub s3_output: S3Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutputConfig {
    pub outputs: Vec<ProcessingOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterConfig {
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingResources {
    pub cluster_config: ClusterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_network_isolation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfigDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingJobArguments {
    pub app_specification: AppSpecification,
    pub role_arn: String,
    pub processing_inputs: Vec<ProcessingInput>,
    pub processing_output_config: ProcessingOutputConfig,
    pub processing_resources: ProcessingResources,
    pub stopping_condition: StoppingCondition,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
}

impl ProcessingJobArguments {
    pub fn from_job(job: &JobSpec) -> Self {
        let network_config = (job.network_isolation || job.vpc_config.is_some()).then(|| {
            NetworkConfig {
                enable_network_isolation: job.network_isolation,
                vpc_config: job.vpc_config.as_ref().map(VpcConfigDocument::from),
            }
        });

        Self {
            app_specification: AppSpecification {
                image_uri: job.image_uri.clone(),
            },
            role_arn: job.role_arn.clone(),
            processing_inputs: job
                .input_channels
                .iter()
                .map(|channel| ProcessingInput {
                    input_name: channel.name.clone(),
                    s3_input: S3Input {
                        s3_uri: channel.s3_uri.clone(),
                        local_path: PROCESSING_INPUT_PATH.to_string(),
                        s3_data_type: "S3Prefix".to_string(),
                        s3_input_mode: "File".to_string(),
                    },
                })
                .collect(),
            processing_output_config: ProcessingOutputConfig {
                outputs: vec![ProcessingOutput {
                    output_name: "output".to_string(),
                    s3_output: S3Output {
                        s3_uri: job.output_path.clone(),
                        local_path: PROCESSING_OUTPUT_PATH.to_string(),
                        s3_upload_mode: "EndOfJob".to_string(),
                    },
                }],
                kms_key_id: job.kms_key_id.clone(),
            },
            processing_resources: ProcessingResources {
                cluster_config: ClusterConfig {
                    instance_type: job.instance_type.clone(),
                    instance_count: job.instance_count,
                    volume_size_in_gb: job.volume_size_gb,
                    volume_kms_key_id: job.kms_key_id.clone(),
                },
            },
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: job.max_runtime_seconds,
                max_wait_time_in_seconds: None,
            },
            environment: job.environment_variables.clone(),
            network_config,
        }
    }
}

impl PipelineDefinition {
    /// Single-step definition for `job`
    pub fn from_job(pipeline_name: impl Into<String>, job: &JobSpec) -> Self {
        let arguments = match job.kind {
            PipelineKind::Training => StepArguments::Training(TrainingJobArguments::from_job(job)),
            PipelineKind::Processing => {
                StepArguments::Processing(ProcessingJobArguments::from_job(job))
            }
        };

        Self {
            version: DEFINITION_VERSION.to_string(),
            metadata: DefinitionMetadata {
                pipeline_name: pipeline_name.into(),
                tags: job.tags.clone(),
            },
            parameters: job
                .pipeline_parameters()
                .into_iter()
                .map(|(name, default_value)| PipelineParameter {
                    name,
                    parameter_type: "String".to_string(),
                    default_value,
                })
                .collect(),
            steps: vec![PipelineStep {
                name: job.name.clone(),
                step_type: job.kind.step_type().to_string(),
                arguments,
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn malformed(value: impl Into<String>, expected: &str) -> ValidationError {
    ValidationError::format("Steps", value, expected)
}

impl JobSpec {
    /// Rebuild the job a definition was composed from
    pub fn from_definition(definition: &PipelineDefinition) -> Result<JobSpec, ValidationError> {
        let [step] = definition.steps.as_slice() else {
            return Err(malformed(
                format!("{} steps", definition.steps.len()),
                "exactly one step",
            ));
        };
        let kind = PipelineKind::from_step_type(&step.step_type)
            .ok_or_else(|| malformed(step.step_type.clone(), "a Training or Processing step"))?;
        let tags = definition.metadata.tags.clone();

        match (&step.arguments, kind) {
            (StepArguments::Training(args), PipelineKind::Training) => Ok(JobSpec {
                kind,
                name: step.name.clone(),
                image_uri: args.algorithm_specification.training_image.clone(),
                role_arn: args.role_arn.clone(),
                instance_type: args.resource_config.instance_type.clone(),
                instance_count: args.resource_config.instance_count,
                volume_size_gb: args.resource_config.volume_size_in_gb,
                max_runtime_seconds: args.stopping_condition.max_runtime_in_seconds,
                input_channels: args
                    .input_data_config
                    .iter()
                    .map(|c| Channel {
                        name: c.channel_name.clone(),
                        s3_uri: c.data_source.s3_data_source.s3_uri.clone(),
                        content_type: c.content_type.clone(),
                    })
                    .collect(),
                output_path: args.output_data_config.s3_output_path.clone(),
                hyperparameters: args.hyper_parameters.clone(),
                environment_variables: args.environment.clone(),
                vpc_config: args.vpc_config.clone().map(VpcConfig::from),
                network_isolation: args.enable_network_isolation,
                spot: match (
                    args.enable_managed_spot_training,
                    args.stopping_condition.max_wait_time_in_seconds,
                    &args.checkpoint_config,
                ) {
                    (true, Some(max_wait_seconds), Some(checkpoint)) => Some(SpotConfig {
                        max_wait_seconds,
                        checkpoint_s3_uri: checkpoint.s3_uri.clone(),
                    }),
                    (true, _, _) => {
                        return Err(malformed(
                            step.name.clone(),
                            "MaxWaitTimeInSeconds and CheckpointConfig with managed spot training",
                        ))
                    }
                    _ => None,
                },
                kms_key_id: args.output_data_config.kms_key_id.clone(),
                tags,
            }),
            (StepArguments::Processing(args), PipelineKind::Processing) => {
                let output = args
                    .processing_output_config
                    .outputs
                    .first()
                    .ok_or_else(|| malformed(step.name.clone(), "one processing output"))?;
                let network = args.network_config.as_ref();
                Ok(JobSpec {
                    kind,
                    name: step.name.clone(),
                    image_uri: args.app_specification.image_uri.clone(),
                    role_arn: args.role_arn.clone(),
                    instance_type: args.processing_resources.cluster_config.instance_type.clone(),
                    instance_count: args.processing_resources.cluster_config.instance_count,
                    volume_size_gb: args.processing_resources.cluster_config.volume_size_in_gb,
                    max_runtime_seconds: args.stopping_condition.max_runtime_in_seconds,
                    input_channels: args
                        .processing_inputs
                        .iter()
                        .map(|input| Channel {
                            name: input.input_name.clone(),
                            s3_uri: input.s3_input.s3_uri.clone(),
                            content_type: super::job_spec::DEFAULT_CONTENT_TYPE.to_string(),
                        })
                        .collect(),
                    output_path: output.s3_output.s3_uri.clone(),
                    hyperparameters: BTreeMap::new(),
                    environment_variables: args.environment.clone(),
                    vpc_config: network
                        .and_then(|n| n.vpc_config.clone())
                        .map(VpcConfig::from),
                    network_isolation: network.is_some_and(|n| n.enable_network_isolation),
                    spot: None,
                    kms_key_id: args.processing_output_config.kms_key_id.clone(),
                    tags,
                })
            }
            _ => Err(malformed(
                step.step_type.clone(),
                "arguments matching the step type",
            )),
        }
    }
}
