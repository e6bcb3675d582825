//! The composed, validated description of one pipeline step

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Content type used for input channels that do not name one
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-parquet";

/// Which pipeline a job belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Training,
    Processing,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [PipelineKind::Training, PipelineKind::Processing];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Processing => "processing",
        }
    }

    /// Step `Type` in a pipeline definition
    pub fn step_type(self) -> &'static str {
        match self {
            Self::Training => "Training",
            Self::Processing => "Processing",
        }
    }

    pub fn from_step_type(step_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.step_type() == step_type)
    }

    /// Feature flag that owns this kind
    pub fn flag_name(self) -> &'static str {
        match self {
            Self::Training => "enable_training_pipeline",
            Self::Processing => "enable_processing_pipeline",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown pipeline kind '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub s3_uri: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcConfig {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotConfig {
    pub max_wait_seconds: u64,
    pub checkpoint_s3_uri: String,
}

/// One training or processing job, immutable once composed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub kind: PipelineKind,
    pub name: String,
    pub image_uri: String,
    pub role_arn: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_seconds: u64,
    pub input_channels: Vec<Channel>,
    pub output_path: String,
    pub hyperparameters: BTreeMap<String, String>,
    pub environment_variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
    #[serde(default)]
    pub network_isolation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl JobSpec {
    /// Named values a pipeline execution is started with.
    ///
    /// The definition declares these as its `Parameters` and the schedule
    /// trigger sends the same list, so the two never drift apart.
    pub fn pipeline_parameters(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("ImageUri".to_string(), self.image_uri.clone()),
            ("InstanceType".to_string(), self.instance_type.clone()),
            ("InstanceCount".to_string(), self.instance_count.to_string()),
            ("VolumeSizeInGB".to_string(), self.volume_size_gb.to_string()),
            (
                "MaxRuntimeInSeconds".to_string(),
                self.max_runtime_seconds.to_string(),
            ),
        ];
        if let Some(channel) = self.input_channels.first() {
            params.push(("InputS3Uri".to_string(), channel.s3_uri.clone()));
        }
        params.push(("OutputS3Uri".to_string(), self.output_path.clone()));
        params
    }
}

/// Merge `reserved` over `caller`; reserved values win and every caller key
/// they replace is logged.
pub(crate) fn merge_reserved(
    kind: PipelineKind,
    map_name: &str,
    caller: &BTreeMap<String, String>,
    reserved: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = caller.clone();
    for (key, value) in reserved {
        if let Some(previous) = merged.insert(key.clone(), value) {
            warn!(
                "{} {}: reserved key '{}' overrides caller value '{}'",
                kind, map_name, key, previous
            );
        }
    }
    merged
}

/// `SM_CHANNEL_<NAME>` for a channel name
pub(crate) fn channel_env_key(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("SM_CHANNEL_{}", upper)
}
