//! Per-role policy synthesis
//!
//! A role exists only when the resource group that uses it exists. S3 access is
//! scoped to the configured bucket; without one the statement falls back to
//! `"*"`, which is logged at warn level and recorded as a [`PolicyWarning`]
//! (or refused outright under `strict_iam`).

use super::statement::{PolicyDocument, PolicyStatement, TrustPolicy};
use crate::compose::{pipeline_name, PipelineKind};
use crate::config::{ProjectContext, ResolvedConfig, ResourceReference};
use crate::error::{ComposeValidation, ValidationError};
use stillwater::Validation;
use crate::features::ResourceGroups;
use crate::schedule::launcher_function_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

const SAGEMAKER_PRINCIPAL: &str = "sagemaker.amazonaws.com";
const SCHEDULER_PRINCIPAL: &str = "scheduler.amazonaws.com";
const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";

const LOG_ACTIONS: [&str; 4] = [
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
    "logs:DescribeLogStreams",
];
const ECR_PULL_ACTIONS: [&str; 3] = [
    "ecr:BatchCheckLayerAvailability",
    "ecr:BatchGetImage",
    "ecr:GetDownloadUrlForLayer",
];
const S3_ACTIONS: [&str; 4] = [
    "s3:DeleteObject",
    "s3:GetObject",
    "s3:ListBucket",
    "s3:PutObject",
];
const VPC_ACTIONS: [&str; 9] = [
    "ec2:CreateNetworkInterface",
    "ec2:CreateNetworkInterfacePermission",
    "ec2:DeleteNetworkInterface",
    "ec2:DeleteNetworkInterfacePermission",
    "ec2:DescribeDhcpOptions",
    "ec2:DescribeNetworkInterfaces",
    "ec2:DescribeSecurityGroups",
    "ec2:DescribeSubnets",
    "ec2:DescribeVpcs",
];
const KMS_ACTIONS: [&str; 3] = ["kms:CreateGrant", "kms:Decrypt", "kms:GenerateDataKey"];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    Training,
    Processing,
    PipelineExecution,
    Scheduler,
    Launcher,
}

impl RoleKind {
    pub const ALL: [RoleKind; 5] = [
        RoleKind::Training,
        RoleKind::Processing,
        RoleKind::PipelineExecution,
        RoleKind::Scheduler,
        RoleKind::Launcher,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Processing => "processing",
            Self::PipelineExecution => "pipeline-execution",
            Self::Scheduler => "scheduler",
            Self::Launcher => "launcher",
        }
    }

    /// `{kind}-role`
    pub fn suffix(self) -> String {
        format!("{}-role", self.as_str())
    }

    pub fn role_name(self, context: &ProjectContext) -> String {
        context.resource_name(&self.suffix())
    }

    pub fn arn(self, context: &ProjectContext) -> String {
        context.role_arn(&self.suffix())
    }

    pub fn service_principal(self) -> &'static str {
        match self {
            Self::Training | Self::Processing | Self::PipelineExecution => SAGEMAKER_PRINCIPAL,
            Self::Scheduler => SCHEDULER_PRINCIPAL,
            Self::Launcher => LAMBDA_PRINCIPAL,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role's trust policy and permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RolePolicy {
    pub role: RoleKind,
    pub role_name: String,
    pub role_arn: String,
    #[serde(rename = "AssumeRolePolicyDocument")]
    pub trust_policy: TrustPolicy,
    #[serde(rename = "PolicyDocument")]
    pub policy: PolicyDocument,
}

/// A statement synthesized in degraded mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyWarning {
    pub role: RoleKind,
    pub sid: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynthesizedPolicies {
    pub roles: Vec<RolePolicy>,
    pub warnings: Vec<PolicyWarning>,
}

impl SynthesizedPolicies {
    pub fn get(&self, role: RoleKind) -> Option<&RolePolicy> {
        self.roles.iter().find(|r| r.role == role)
    }
}

/// ARN of the ECR repository an image URI points into
pub fn ecr_repository_arn(image_uri: &str) -> Option<String> {
    let (host, path) = image_uri.split_once('/')?;
    let mut host_parts = host.split('.');
    let account = host_parts.next()?;
    let region = host_parts.nth(2)?;
    let repository = path.split('@').next()?;
    let repository = repository
        .rsplit_once(':')
        .map(|(repo, _tag)| repo)
        .unwrap_or(repository);
    Some(format!(
        "arn:aws:ecr:{}:{}:repository/{}",
        region, account, repository
    ))
}

struct Synthesizer<'a> {
    resolved: &'a ResolvedConfig,
    groups: &'a ResourceGroups,
    warnings: Vec<PolicyWarning>,
}

impl<'a> Synthesizer<'a> {
    fn context(&self) -> &ProjectContext {
        &self.resolved.context
    }

    fn role(&self, role: RoleKind, policy: PolicyDocument) -> RolePolicy {
        debug!(
            "Synthesized {} role with {} statement(s)",
            role,
            policy.statements.len()
        );
        RolePolicy {
            role,
            role_name: role.role_name(self.context()),
            role_arn: role.arn(self.context()),
            trust_policy: TrustPolicy::for_service(role.service_principal()),
            policy,
        }
    }

    fn log_statement(&self, log_group: &str) -> PolicyStatement {
        PolicyStatement::allow(
            "CloudWatchLogs",
            LOG_ACTIONS,
            [self
                .context()
                .arn("logs", &format!("log-group:{}*", log_group))],
        )
    }

    fn ecr_statements(&self, image: &ResourceReference, doc: &mut PolicyDocument) {
        doc.push(PolicyStatement::allow(
            "EcrAuthorization",
            ["ecr:GetAuthorizationToken"],
            ["*"],
        ));
        let repository = ecr_repository_arn(image.as_str()).unwrap_or_else(|| "*".to_string());
        doc.push(PolicyStatement::allow("EcrImagePull", ECR_PULL_ACTIONS, [repository]));
    }

    fn s3_statement(&mut self, role: RoleKind) -> PolicyStatement {
        match &self.resolved.references.bucket {
            Some(bucket) => PolicyStatement::allow(
                "S3Access",
                S3_ACTIONS,
                [bucket.identifier.clone(), format!("{}/*", bucket.identifier)],
            ),
            None => {
                let message = format!(
                    "{} role S3 access is not scoped to a bucket (Resource = \"*\"); set s3_bucket_arn",
                    role
                );
                warn!("{}", message);
                self.warnings.push(PolicyWarning {
                    role,
                    sid: "S3Access".to_string(),
                    message,
                });
                PolicyStatement::allow("S3Access", S3_ACTIONS, ["*"])
            }
        }
    }

    fn shared_statements(&self, doc: &mut PolicyDocument) {
        let refs = &self.resolved.references;
        if self.groups.vpc.is_some() {
            doc.push(PolicyStatement::allow("VpcNetworkInterfaces", VPC_ACTIONS, ["*"]));
        }
        if let Some(server) = &refs.mlflow_server {
            doc.push(PolicyStatement::allow(
                "MlflowTracking",
                ["sagemaker-mlflow:*"],
                [server.identifier.clone()],
            ));
        }
        if let Some(key) = &refs.kms_key {
            doc.push(PolicyStatement::allow(
                "KmsAccess",
                KMS_ACTIONS,
                [key.identifier.clone()],
            ));
        }
    }

    fn job_role(&mut self, role: RoleKind, image: &ResourceReference) -> RolePolicy {
        let mut doc = PolicyDocument::new();
        doc.push(self.log_statement("/aws/sagemaker/"));
        self.ecr_statements(image, &mut doc);
        doc.push(self.s3_statement(role));
        self.shared_statements(&mut doc);
        self.role(role, doc)
    }

    fn job_arn(&self, kind: PipelineKind) -> String {
        let resource = match kind {
            PipelineKind::Training => "training-job",
            PipelineKind::Processing => "processing-job",
        };
        self.context()
            .arn("sagemaker", &format!("{}/{}-*", resource, self.context().prefix()))
    }

    fn pipeline_execution_role(&self) -> RolePolicy {
        let mut doc = PolicyDocument::new();
        let mut actions = vec!["sagemaker:AddTags"];
        let mut resources = Vec::new();
        let mut passed_roles = Vec::new();
        if self.groups.training.is_some() {
            actions.extend([
                "sagemaker:CreateTrainingJob",
                "sagemaker:DescribeTrainingJob",
                "sagemaker:StopTrainingJob",
            ]);
            resources.push(self.job_arn(PipelineKind::Training));
            passed_roles.push(RoleKind::Training.arn(self.context()));
        }
        if self.groups.processing.is_some() {
            actions.extend([
                "sagemaker:CreateProcessingJob",
                "sagemaker:DescribeProcessingJob",
                "sagemaker:StopProcessingJob",
            ]);
            resources.push(self.job_arn(PipelineKind::Processing));
            passed_roles.push(RoleKind::Processing.arn(self.context()));
        }
        doc.push(PolicyStatement::allow("PipelineJobs", actions, resources));
        doc.push(PolicyStatement::allow("PassJobRoles", ["iam:PassRole"], passed_roles));
        self.role(RoleKind::PipelineExecution, doc)
    }

    fn launcher_arn(&self) -> String {
        self.context().arn(
            "lambda",
            &format!("function:{}", launcher_function_name(self.context())),
        )
    }

    fn scheduler_role(&self) -> RolePolicy {
        let mut doc = PolicyDocument::new();
        let launcher = self.groups.launcher.is_some();
        let pipelines: Vec<String> = self
            .groups
            .enabled_kinds()
            .into_iter()
            .filter(|kind| !(launcher && *kind == PipelineKind::Training))
            .map(|kind| {
                self.context().arn(
                    "sagemaker",
                    &format!("pipeline/{}", pipeline_name(self.context(), kind)),
                )
            })
            .collect();
        if !pipelines.is_empty() {
            doc.push(PolicyStatement::allow(
                "StartPipelineExecution",
                ["sagemaker:StartPipelineExecution"],
                pipelines,
            ));
        }
        if launcher {
            doc.push(PolicyStatement::allow(
                "InvokeLauncher",
                ["lambda:InvokeFunction"],
                [self.launcher_arn()],
            ));
        }
        self.role(RoleKind::Scheduler, doc)
    }

    fn launcher_role(&self) -> RolePolicy {
        let mut doc = PolicyDocument::new();
        doc.push(self.log_statement(&format!(
            "/aws/lambda/{}",
            launcher_function_name(self.context())
        )));
        doc.push(PolicyStatement::allow(
            "CreateTrainingJob",
            ["sagemaker:AddTags", "sagemaker:CreateTrainingJob"],
            [self.job_arn(PipelineKind::Training)],
        ));
        doc.push(PolicyStatement::allow(
            "PassTrainingRole",
            ["iam:PassRole"],
            [RoleKind::Training.arn(self.context())],
        ));
        self.role(RoleKind::Launcher, doc)
    }
}

/// Derive every role's policy from the active groups and references
pub fn synthesize(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
) -> ComposeValidation<SynthesizedPolicies> {
    let strict = resolved.settings.strict_iam && !groups.enabled_kinds().is_empty();
    if strict && resolved.references.bucket.is_none() {
        return Validation::failure(vec![ValidationError::dependency(
            "s3_bucket_arn",
            "strict_iam is true",
        )]);
    }

    let mut synth = Synthesizer {
        resolved,
        groups,
        warnings: Vec::new(),
    };
    let mut roles = Vec::new();

    if let Some(training) = &groups.training {
        roles.push(synth.job_role(RoleKind::Training, &training.image));
    }
    if let Some(processing) = &groups.processing {
        roles.push(synth.job_role(RoleKind::Processing, &processing.image));
    }
    if !groups.enabled_kinds().is_empty() {
        roles.push(synth.pipeline_execution_role());
    }
    if groups.scheduling.is_some() {
        roles.push(synth.scheduler_role());
    }
    if groups.launcher.is_some() {
        roles.push(synth.launcher_role());
    }

    Validation::success(SynthesizedPolicies {
        roles,
        warnings: synth.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, PlatformInput};
    use crate::error::ValidationErrors;
    use crate::features::evaluate;

    const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/team/trainer:1.0";
    const MLFLOW_ARN: &str =
        "arn:aws:sagemaker:us-east-1:123456789012:mlflow-tracking-server/mlflow-staging";

    fn training_input() -> PlatformInput {
        let mut input = PlatformInput::new("ml-platform", "staging");
        input.enable_training_pipeline = true;
        input.training_image_uri = Some(IMAGE.to_string());
        input
    }

    fn run(input: &PlatformInput) -> Result<SynthesizedPolicies, ValidationErrors> {
        let resolved = resolve(input).into_result().unwrap();
        let groups = evaluate(&resolved).into_result().unwrap();
        synthesize(&resolved, &groups)
            .into_result()
            .map_err(ValidationErrors::from)
    }

    #[test]
    fn test_ecr_repository_arn() {
        assert_eq!(
            ecr_repository_arn(IMAGE).as_deref(),
            Some("arn:aws:ecr:us-east-1:123456789012:repository/team/trainer")
        );
        assert_eq!(
            ecr_repository_arn("123.dkr.ecr.eu-west-1.amazonaws.com/img").as_deref(),
            Some("arn:aws:ecr:eu-west-1:123:repository/img")
        );
        assert_eq!(ecr_repository_arn("no-slash"), None);
    }

    #[test]
    fn test_training_only_roles() {
        let policies = run(&training_input()).unwrap();
        let kinds: Vec<RoleKind> = policies.roles.iter().map(|r| r.role).collect();
        assert_eq!(kinds, vec![RoleKind::Training, RoleKind::PipelineExecution]);

        let training = policies.get(RoleKind::Training).unwrap();
        assert_eq!(training.role_name, "ml-platform-staging-training-role");
        assert_eq!(training.trust_policy.service(), Some(SAGEMAKER_PRINCIPAL));
        assert!(!training.policy.grants("ec2:CreateNetworkInterface"));
        assert!(!training.policy.grants("sagemaker-mlflow:*"));
        assert!(!training.policy.grants("kms:Decrypt"));
    }

    #[test]
    fn test_s3_wildcard_fallback_is_recorded() {
        let policies = run(&training_input()).unwrap();
        assert_eq!(policies.warnings.len(), 1);
        assert_eq!(policies.warnings[0].role, RoleKind::Training);
        let s3 = policies
            .get(RoleKind::Training)
            .unwrap()
            .policy
            .statement("S3Access")
            .unwrap();
        assert!(s3.is_wildcard());
    }

    #[test]
    fn test_s3_scoped_to_bucket() {
        let mut input = training_input();
        input.s3_bucket_arn = Some("arn:aws:s3:::ml-artifacts".to_string());
        let policies = run(&input).unwrap();
        assert!(policies.warnings.is_empty());
        let s3 = policies
            .get(RoleKind::Training)
            .unwrap()
            .policy
            .statement("S3Access")
            .unwrap();
        assert!(s3.resources.contains("arn:aws:s3:::ml-artifacts"));
        assert!(s3.resources.contains("arn:aws:s3:::ml-artifacts/*"));
    }

    #[test]
    fn test_optional_statements() {
        let mut input = training_input();
        input.subnet_ids = vec!["subnet-1".to_string()];
        input.security_group_ids = vec!["sg-1".to_string()];
        input.mlflow_tracking_server_arn = Some(MLFLOW_ARN.to_string());
        input.kms_key_arn = Some("arn:aws:kms:us-east-1:123456789012:key/abc-123".to_string());
        let policies = run(&input).unwrap();
        let policy = &policies.get(RoleKind::Training).unwrap().policy;
        assert!(policy.grants("ec2:CreateNetworkInterface"));
        assert!(policy
            .statement("MlflowTracking")
            .unwrap()
            .resources
            .contains(MLFLOW_ARN));
        assert!(policy.grants("kms:GenerateDataKey"));
    }

    #[test]
    fn test_mlflow_uri_alone_grants_nothing() {
        let mut input = training_input();
        input.mlflow_tracking_uri = Some("https://mlflow.internal".to_string());
        let policies = run(&input).unwrap();
        assert!(!policies
            .get(RoleKind::Training)
            .unwrap()
            .policy
            .grants("sagemaker-mlflow:*"));
    }

    #[test]
    fn test_scheduler_and_launcher_roles() {
        let mut input = training_input();
        input.enable_scheduling = true;
        input.schedule_expression = Some("rate(1 day)".to_string());
        let policies = run(&input).unwrap();
        let scheduler = policies.get(RoleKind::Scheduler).unwrap();
        assert_eq!(scheduler.trust_policy.service(), Some(SCHEDULER_PRINCIPAL));
        assert!(scheduler.policy.grants("sagemaker:StartPipelineExecution"));
        assert!(policies.get(RoleKind::Launcher).is_none());

        input.enable_custom_launcher = true;
        input.launcher_artifact_path = Some("build/launcher.zip".to_string());
        let policies = run(&input).unwrap();
        let scheduler = policies.get(RoleKind::Scheduler).unwrap();
        assert!(scheduler.policy.grants("lambda:InvokeFunction"));
        assert!(!scheduler.policy.grants("sagemaker:StartPipelineExecution"));
        let launcher = policies.get(RoleKind::Launcher).unwrap();
        assert_eq!(launcher.trust_policy.service(), Some(LAMBDA_PRINCIPAL));
        assert!(launcher.policy.grants("iam:PassRole"));
    }

    #[test]
    fn test_pipeline_execution_passes_job_roles() {
        let policies = run(&training_input()).unwrap();
        let exec = policies.get(RoleKind::PipelineExecution).unwrap();
        let pass = exec.policy.statement("PassJobRoles").unwrap();
        assert!(pass
            .resources
            .contains("arn:aws:iam::123456789012:role/ml-platform-staging-training-role"));
        assert!(exec.policy.grants("sagemaker:CreateTrainingJob"));
        assert!(!exec.policy.grants("sagemaker:CreateProcessingJob"));
    }

    #[test]
    fn test_no_pipelines_no_roles() {
        let policies = run(&PlatformInput::new("ml-platform", "dev")).unwrap();
        assert!(policies.roles.is_empty());
    }

    #[test]
    fn test_strict_iam_refuses_wildcard_bucket() {
        let mut input = training_input();
        input.strict_iam = true;
        let resolved = resolve(&input).into_result().unwrap();
        let (groups, _) = crate::features::evaluate_lenient(&resolved);

        match synthesize(&resolved, &groups) {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field(), "s3_bucket_arn");
            }
            Validation::Success(_) => panic!("Expected strict_iam without a bucket to fail"),
        }
    }
}
