//! Configuration resolution
//!
//! Turns a raw [`PlatformInput`] into a [`ResolvedConfig`]: a validated
//! [`ProjectContext`], the [`FeatureFlags`], every external
//! [`ResourceReference`] with its format checked, and the job settings the
//! composer reads. Resolution is pure; it derives names but never looks
//! anything up.

use super::input::PlatformInput;
use super::patterns::{ecr_account, Rule};
use crate::error::{validated, ComposeValidation, ValidationError};
use crate::schedule::ScheduleExpression;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Account id used in derived ARNs when none could be resolved
pub const ACCOUNT_PLACEHOLDER: &str = "000000000000";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Staging, Environment::Prod];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| ValidationError::format("environment", s, "one of: dev, staging, prod"))
    }
}

/// Identity of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_name: String,
    pub environment: Environment,
    pub owner: String,
    pub region: String,
    pub account_id: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl ProjectContext {
    /// `{project}-{environment}`
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.project_name, self.environment)
    }

    /// `{project}-{environment}-{suffix}`
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.prefix(), suffix)
    }

    pub fn account(&self) -> &str {
        self.account_id.as_deref().unwrap_or(ACCOUNT_PLACEHOLDER)
    }

    /// Bucket used for artifacts when no explicit paths are configured
    pub fn default_bucket(&self) -> String {
        self.resource_name("ml-artifacts")
    }

    /// Regional ARN in this deployment's account
    pub fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{}:{}:{}:{}",
            service,
            self.region,
            self.account(),
            resource
        )
    }

    /// ARN of the IAM role `{project}-{environment}-{suffix}`
    pub fn role_arn(&self, suffix: &str) -> String {
        format!(
            "arn:aws:iam::{}:role/{}",
            self.account(),
            self.resource_name(suffix)
        )
    }

    /// Default tags merged with user tags; user tags win
    pub fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::from([
            ("Project".to_string(), self.project_name.clone()),
            ("Environment".to_string(), self.environment.to_string()),
            ("Owner".to_string(), self.owner.clone()),
            ("ManagedBy".to_string(), "sm-composer".to_string()),
        ]);
        tags.extend(self.tags.clone());
        tags
    }
}

/// Booleans controlling which optional resource groups exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub training_enabled: bool,
    pub processing_enabled: bool,
    pub scheduling_enabled: bool,
    pub spot_enabled: bool,
    pub network_isolation_enabled: bool,
    pub custom_launcher_enabled: bool,
}

impl FeatureFlags {
    pub fn any_pipeline(&self) -> bool {
        self.training_enabled || self.processing_enabled
    }
}

/// Kind of externally managed resource a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    S3,
    Vpc,
    Subnet,
    SecurityGroup,
    EcrImage,
    MlflowServer,
    KmsKey,
}

/// Identifier of a pre-existing resource; never created by this tool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    pub kind: ResourceKind,
    pub identifier: String,
}

impl ResourceReference {
    /// Check `value` against `rule` and wrap it
    pub fn parse(
        kind: ResourceKind,
        rule: Rule,
        field: &str,
        value: &str,
    ) -> Result<Self, ValidationError> {
        rule.check(field, value)?;
        Ok(Self::unchecked(kind, value))
    }

    fn unchecked(kind: ResourceKind, value: &str) -> Self {
        Self {
            kind,
            identifier: value.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.identifier
    }
}

/// Every external reference found in the input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReferences {
    pub training_image: Option<ResourceReference>,
    pub inference_image: Option<ResourceReference>,
    pub training_output: Option<ResourceReference>,
    pub checkpoint: Option<ResourceReference>,
    pub inference_input: Option<ResourceReference>,
    pub inference_output: Option<ResourceReference>,
    pub bucket: Option<ResourceReference>,
    pub mlflow_server: Option<ResourceReference>,
    pub kms_key: Option<ResourceReference>,
    pub vpc: Option<ResourceReference>,
    pub subnets: Vec<ResourceReference>,
    pub security_groups: Vec<ResourceReference>,
}

/// One training input channel after format checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChannel {
    pub name: String,
    pub s3_uri: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_seconds: Option<u64>,
    pub max_wait_time_seconds: Option<u64>,
    pub input_channels: Vec<InputChannel>,
    pub hyperparameters: BTreeMap<String, String>,
    pub environment_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaSettings {
    pub bootstrap_servers: String,
    pub topic: String,
    pub security_protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_seconds: Option<u64>,
    pub environment_variables: BTreeMap<String, String>,
    pub kafka: Option<KafkaSettings>,
}

/// A configured schedule expression. Malformed text is kept so dependency
/// checks still see the expression as present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionSetting {
    Parsed(ScheduleExpression),
    Malformed(String),
}

impl ExpressionSetting {
    pub fn parsed(&self) -> Option<&ScheduleExpression> {
        match self {
            Self::Parsed(expression) => Some(expression),
            Self::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    pub training_expression: Option<ExpressionSetting>,
    pub processing_expression: Option<ExpressionSetting>,
    pub enabled: bool,
    pub launcher_artifact_path: Option<String>,
}

/// Knobs read by the composer, binder and synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub training: TrainingSettings,
    pub processing: ProcessingSettings,
    pub schedule: ScheduleSettings,
    pub mlflow_tracking_uri: Option<String>,
    pub strict_iam: bool,
}

/// Output of the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub context: ProjectContext,
    pub flags: FeatureFlags,
    pub references: ResourceReferences,
    pub settings: Settings,
}

/// Treats `""` the same as an unset value
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validate an optional reference, keeping it even when malformed so later
/// dependency checks see it as present.
fn reference(
    errors: &mut Vec<ValidationError>,
    kind: ResourceKind,
    rule: Rule,
    field: &str,
    value: &Option<String>,
) -> Option<ResourceReference> {
    let value = present(value)?;
    match ResourceReference::parse(kind, rule, field, value) {
        Ok(reference) => Some(reference),
        Err(err) => {
            errors.push(err);
            Some(ResourceReference::unchecked(kind, value))
        }
    }
}

fn reference_list(
    errors: &mut Vec<ValidationError>,
    kind: ResourceKind,
    rule: Rule,
    field: &str,
    values: &[String],
) -> Vec<ResourceReference> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(i, v)| {
            let field = format!("{}[{}]", field, i);
            match ResourceReference::parse(kind, rule, &field, v.trim()) {
                Ok(reference) => reference,
                Err(err) => {
                    errors.push(err);
                    ResourceReference::unchecked(kind, v.trim())
                }
            }
        })
        .collect()
}

fn resolve_context(input: &PlatformInput, errors: &mut Vec<ValidationError>) -> ProjectContext {
    if let Err(err) = Rule::ProjectName.check("project_name", &input.project_name) {
        errors.push(err);
    }

    let environment = match input.environment.parse::<Environment>() {
        Ok(env) => env,
        Err(err) => {
            errors.push(err);
            Environment::Dev
        }
    };

    if let Err(err) = Rule::Region.check("region", &input.region) {
        errors.push(err);
    }

    let explicit_account = present(&input.account_id).map(|account| {
        if let Err(err) = Rule::AccountId.check("account_id", account) {
            errors.push(err);
        }
        account.to_string()
    });
    let account_id = explicit_account.or_else(|| {
        [&input.training_image_uri, &input.inference_image_uri]
            .into_iter()
            .filter_map(present)
            .find_map(ecr_account)
            .map(str::to_string)
    });

    ProjectContext {
        project_name: input.project_name.clone(),
        environment,
        owner: input.owner.clone(),
        region: input.region.clone(),
        account_id,
        tags: input.tags.clone(),
    }
}

fn resolve_references(input: &PlatformInput, errors: &mut Vec<ValidationError>) -> ResourceReferences {
    use ResourceKind as K;

    ResourceReferences {
        training_image: reference(
            errors,
            K::EcrImage,
            Rule::EcrImage,
            "training_image_uri",
            &input.training_image_uri,
        ),
        inference_image: reference(
            errors,
            K::EcrImage,
            Rule::EcrImage,
            "inference_image_uri",
            &input.inference_image_uri,
        ),
        training_output: reference(
            errors,
            K::S3,
            Rule::S3Uri,
            "output_data_s3_path",
            &input.output_data_s3_path,
        ),
        checkpoint: reference(
            errors,
            K::S3,
            Rule::S3Uri,
            "checkpoint_s3_uri",
            &input.checkpoint_s3_uri,
        ),
        inference_input: reference(
            errors,
            K::S3,
            Rule::S3Uri,
            "inference_input_s3_path",
            &input.inference_input_s3_path,
        ),
        inference_output: reference(
            errors,
            K::S3,
            Rule::S3Uri,
            "inference_output_s3_path",
            &input.inference_output_s3_path,
        ),
        bucket: reference(
            errors,
            K::S3,
            Rule::S3BucketArn,
            "s3_bucket_arn",
            &input.s3_bucket_arn,
        ),
        mlflow_server: reference(
            errors,
            K::MlflowServer,
            Rule::MlflowServerArn,
            "mlflow_tracking_server_arn",
            &input.mlflow_tracking_server_arn,
        ),
        kms_key: reference(
            errors,
            K::KmsKey,
            Rule::KmsKeyArn,
            "kms_key_arn",
            &input.kms_key_arn,
        ),
        vpc: reference(errors, K::Vpc, Rule::VpcId, "vpc_id", &input.vpc_id),
        subnets: reference_list(
            errors,
            K::Subnet,
            Rule::SubnetId,
            "subnet_ids",
            &input.subnet_ids,
        ),
        security_groups: reference_list(
            errors,
            K::SecurityGroup,
            Rule::SecurityGroupId,
            "security_group_ids",
            &input.security_group_ids,
        ),
    }
}

fn resolve_channels(input: &PlatformInput, errors: &mut Vec<ValidationError>) -> Vec<InputChannel> {
    let mut seen = BTreeSet::new();
    input
        .input_data_config
        .iter()
        .enumerate()
        .map(|(i, channel)| {
            let name_field = format!("input_data_config[{}].channel_name", i);
            if let Err(err) = Rule::ChannelName.check(&name_field, &channel.channel_name) {
                errors.push(err);
            } else if !seen.insert(channel.channel_name.clone()) {
                errors.push(ValidationError::format(
                    name_field,
                    &channel.channel_name,
                    "a channel name not used by another input channel",
                ));
            }

            let uri_field = format!("input_data_config[{}].s3_uri", i);
            if let Err(err) = Rule::S3Uri.check(&uri_field, &channel.s3_uri) {
                errors.push(err);
            }

            InputChannel {
                name: channel.channel_name.clone(),
                s3_uri: channel.s3_uri.clone(),
                content_type: present(&channel.content_type).map(str::to_string),
            }
        })
        .collect()
}

fn resolve_settings(input: &PlatformInput, errors: &mut Vec<ValidationError>) -> Settings {
    if let Err(err) = Rule::InstanceType.check("instance_type", &input.instance_type) {
        errors.push(err);
    }

    let processing_instance_type = present(&input.processing_instance_type)
        .map(|t| {
            if let Err(err) = Rule::InstanceType.check("processing_instance_type", t) {
                errors.push(err);
            }
            t.to_string()
        })
        .unwrap_or_else(|| input.instance_type.clone());

    let mlflow_tracking_uri = present(&input.mlflow_tracking_uri).map(|uri| {
        if let Err(err) = Rule::HttpUri.check("mlflow_tracking_uri", uri) {
            errors.push(err);
        }
        uri.to_string()
    });

    let kafka = present(&input.kafka_bootstrap_servers).map(|servers| {
        if let Err(err) = Rule::KafkaBootstrap.check("kafka_bootstrap_servers", servers) {
            errors.push(err);
        }
        KafkaSettings {
            bootstrap_servers: servers.to_string(),
            topic: present(&input.kafka_topic)
                .map(str::to_string)
                .unwrap_or_else(|| format!("ml-predictions-{}", input.environment)),
            security_protocol: present(&input.kafka_security_protocol)
                .map(str::to_string)
                .unwrap_or_else(|| "SASL_SSL".to_string()),
        }
    });

    let mut expression = |field: &str, value: &Option<String>| {
        present(value).map(|text| match ScheduleExpression::parse(field, text) {
            Ok(parsed) => ExpressionSetting::Parsed(parsed),
            Err(err) => {
                errors.push(err);
                ExpressionSetting::Malformed(text.to_string())
            }
        })
    };
    let training_expression = expression("schedule_expression", &input.schedule_expression);
    let processing_expression = expression(
        "processing_schedule_expression",
        &input.processing_schedule_expression,
    );

    let launcher_artifact_path = present(&input.launcher_artifact_path).map(|path| {
        if let Err(err) = Rule::LauncherArtifact.check("launcher_artifact_path", path) {
            errors.push(err);
        }
        path.to_string()
    });

    Settings {
        training: TrainingSettings {
            instance_type: input.instance_type.clone(),
            instance_count: input.instance_count,
            volume_size_gb: input.volume_size_gb,
            max_runtime_seconds: input.max_runtime_seconds,
            max_wait_time_seconds: input.max_wait_time_seconds,
            input_channels: resolve_channels(input, errors),
            hyperparameters: input.hyperparameters.clone(),
            environment_variables: input.environment_variables.clone(),
        },
        processing: ProcessingSettings {
            instance_type: processing_instance_type,
            instance_count: input.processing_instance_count.unwrap_or(input.instance_count),
            volume_size_gb: input.processing_volume_size_gb.unwrap_or(input.volume_size_gb),
            max_runtime_seconds: input.processing_max_runtime_seconds,
            environment_variables: input.processing_environment_variables.clone(),
            kafka,
        },
        schedule: ScheduleSettings {
            training_expression,
            processing_expression,
            enabled: input.schedule_enabled,
            launcher_artifact_path,
        },
        mlflow_tracking_uri,
        strict_iam: input.strict_iam,
    }
}

/// Resolve every field, recording format issues without stopping.
///
/// Malformed references are kept in the result so that dependency checks do
/// not report them a second time as missing.
pub fn resolve_lenient(input: &PlatformInput) -> (ResolvedConfig, Vec<ValidationError>) {
    let mut errors = Vec::new();

    let context = resolve_context(input, &mut errors);
    let references = resolve_references(input, &mut errors);
    let settings = resolve_settings(input, &mut errors);
    let flags = FeatureFlags {
        training_enabled: input.enable_training_pipeline,
        processing_enabled: input.enable_processing_pipeline,
        scheduling_enabled: input.enable_scheduling,
        spot_enabled: input.enable_spot_training,
        network_isolation_enabled: input.enable_network_isolation,
        custom_launcher_enabled: input.enable_custom_launcher,
    };

    let resolved = ResolvedConfig {
        context,
        flags,
        references,
        settings,
    };
    (resolved, errors)
}

/// Resolve and validate formats; fails with every FormatError found
pub fn resolve(input: &PlatformInput) -> ComposeValidation<ResolvedConfig> {
    let (resolved, errors) = resolve_lenient(input);
    validated(resolved, errors)
}
