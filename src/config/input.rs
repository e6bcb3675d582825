//! Raw platform configuration as it appears in the config file
//!
//! Field names match the Terraform variables they replace. Nothing here is
//! validated; see [`crate::config::resolver`] for that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input channel of a training job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputChannelInput {
    pub channel_name: String,
    pub s3_uri: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Flat configuration object consumed by every component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformInput {
    pub project_name: String,
    pub environment: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    // Feature flags
    #[serde(default)]
    pub enable_training_pipeline: bool,
    #[serde(default)]
    pub enable_processing_pipeline: bool,
    #[serde(default)]
    pub enable_scheduling: bool,
    #[serde(default)]
    pub enable_custom_launcher: bool,
    #[serde(default)]
    pub enable_spot_training: bool,
    #[serde(default)]
    pub enable_network_isolation: bool,
    /// Refuse the `Resource = "*"` S3 fallback instead of warning about it
    #[serde(default)]
    pub strict_iam: bool,

    // Training job
    #[serde(default)]
    pub training_image_uri: Option<String>,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,
    #[serde(default = "default_volume_size_gb")]
    pub volume_size_gb: u32,
    #[serde(default)]
    pub max_runtime_seconds: Option<u64>,
    #[serde(default)]
    pub max_wait_time_seconds: Option<u64>,
    #[serde(default)]
    pub checkpoint_s3_uri: Option<String>,
    #[serde(default)]
    pub input_data_config: Vec<InputChannelInput>,
    #[serde(default)]
    pub output_data_s3_path: Option<String>,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, String>,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    // Processing (batch inference) job
    #[serde(default)]
    pub inference_image_uri: Option<String>,
    #[serde(default)]
    pub inference_input_s3_path: Option<String>,
    #[serde(default)]
    pub inference_output_s3_path: Option<String>,
    #[serde(default)]
    pub processing_instance_type: Option<String>,
    #[serde(default)]
    pub processing_instance_count: Option<u32>,
    #[serde(default)]
    pub processing_volume_size_gb: Option<u32>,
    #[serde(default)]
    pub processing_max_runtime_seconds: Option<u64>,
    #[serde(default)]
    pub processing_environment_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub kafka_bootstrap_servers: Option<String>,
    #[serde(default)]
    pub kafka_topic: Option<String>,
    #[serde(default)]
    pub kafka_security_protocol: Option<String>,

    // Scheduling
    #[serde(default)]
    pub schedule_expression: Option<String>,
    #[serde(default)]
    pub processing_schedule_expression: Option<String>,
    #[serde(default)]
    pub schedule_enabled: bool,
    #[serde(default)]
    pub launcher_artifact_path: Option<String>,

    // External references
    #[serde(default)]
    pub mlflow_tracking_server_arn: Option<String>,
    #[serde(default)]
    pub mlflow_tracking_uri: Option<String>,
    #[serde(default)]
    pub s3_bucket_arn: Option<String>,
    #[serde(default)]
    pub kms_key_arn: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

fn default_owner() -> String {
    "ml-platform".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_instance_type() -> String {
    "ml.m5.large".to_string()
}

fn default_instance_count() -> u32 {
    1
}

fn default_volume_size_gb() -> u32 {
    30
}

impl PlatformInput {
    /// Minimal input with every optional field at its default
    pub fn new(project_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            environment: environment.into(),
            owner: default_owner(),
            region: default_region(),
            account_id: None,
            tags: BTreeMap::new(),
            enable_training_pipeline: false,
            enable_processing_pipeline: false,
            enable_scheduling: false,
            enable_custom_launcher: false,
            enable_spot_training: false,
            enable_network_isolation: false,
            strict_iam: false,
            training_image_uri: None,
            instance_type: default_instance_type(),
            instance_count: default_instance_count(),
            volume_size_gb: default_volume_size_gb(),
            max_runtime_seconds: None,
            max_wait_time_seconds: None,
            checkpoint_s3_uri: None,
            input_data_config: Vec::new(),
            output_data_s3_path: None,
            hyperparameters: BTreeMap::new(),
            environment_variables: BTreeMap::new(),
            inference_image_uri: None,
            inference_input_s3_path: None,
            inference_output_s3_path: None,
            processing_instance_type: None,
            processing_instance_count: None,
            processing_volume_size_gb: None,
            processing_max_runtime_seconds: None,
            processing_environment_variables: BTreeMap::new(),
            kafka_bootstrap_servers: None,
            kafka_topic: None,
            kafka_security_protocol: None,
            schedule_expression: None,
            processing_schedule_expression: None,
            schedule_enabled: false,
            launcher_artifact_path: None,
            mlflow_tracking_server_arn: None,
            mlflow_tracking_uri: None,
            s3_bucket_arn: None,
            kms_key_arn: None,
            vpc_id: None,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
project_name: ml-platform
environment: staging
enable_training_pipeline: true
training_image_uri: 123.dkr.ecr.us-east-1.amazonaws.com/img:latest
"#;
        let input: PlatformInput = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(input.owner, "ml-platform");
        assert_eq!(input.region, "us-east-1");
        assert_eq!(input.instance_type, "ml.m5.large");
        assert_eq!(input.instance_count, 1);
        assert_eq!(input.volume_size_gb, 30);
        assert!(input.enable_training_pipeline);
        assert!(!input.enable_processing_pipeline);
        assert!(!input.schedule_enabled);
        assert!(input.subnet_ids.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
project_name: ml-platform
environment: staging
enable_trainig_pipeline: true
"#;
        let err = serde_yaml::from_str::<PlatformInput>(yaml).unwrap_err();
        assert!(err.to_string().contains("enable_trainig_pipeline"));
    }

    #[test]
    fn test_input_channels_parse() {
        let json = r#"{
            "project_name": "ml-platform",
            "environment": "dev",
            "input_data_config": [
                {"channel_name": "training", "s3_uri": "s3://bucket/train/"},
                {"channel_name": "validation", "s3_uri": "s3://bucket/val/", "content_type": "text/csv"}
            ]
        }"#;
        let input: PlatformInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.input_data_config.len(), 2);
        assert_eq!(input.input_data_config[0].content_type, None);
        assert_eq!(
            input.input_data_config[1].content_type.as_deref(),
            Some("text/csv")
        );
    }

    #[test]
    fn test_new_matches_serde_defaults() {
        let yaml = "project_name: p\nenvironment: dev\n";
        let parsed: PlatformInput = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, PlatformInput::new("p", "dev"));
    }
}
