//! Format rules for configuration values
//!
//! Each [`Rule`] pairs a compiled regex with the pattern text reported back to
//! the user when a value does not match.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! rule_regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).expect("rule regex compiles"));
    };
}

const PROJECT_NAME_PATTERN: &str = r"^[a-z0-9-]+$";
const REGION_PATTERN: &str = r"^[a-z]{2}(-[a-z]+)+-\d$";
const ACCOUNT_ID_PATTERN: &str = r"^\d{1,12}$";
const VPC_ID_PATTERN: &str = r"^vpc-[a-z0-9]+$";
const SUBNET_ID_PATTERN: &str = r"^subnet-[a-z0-9]+$";
const SECURITY_GROUP_ID_PATTERN: &str = r"^sg-[a-z0-9]+$";
const S3_URI_PATTERN: &str = r"^s3://[a-z0-9][a-z0-9.-]*[a-z0-9](/.*)?$";
const ECR_IMAGE_PATTERN: &str = r"^(\d{1,12})\.dkr\.ecr\.([a-z0-9-]+)\.amazonaws\.com(\.cn)?/[a-z0-9][a-z0-9._/-]*(:[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}|@sha256:[a-f0-9]{64})?$";
const INSTANCE_TYPE_PATTERN: &str = r"^ml\.[a-z0-9-]+\.[a-z0-9]+$";
const S3_BUCKET_ARN_PATTERN: &str = r"^arn:aws[a-z-]*:s3:::[a-z0-9][a-z0-9.-]*[a-z0-9]$";
const MLFLOW_SERVER_ARN_PATTERN: &str =
    r"^arn:aws[a-z-]*:sagemaker:[a-z0-9-]+:\d{1,12}:mlflow-tracking-server/[A-Za-z0-9-]+$";
const HTTP_URI_PATTERN: &str = r"^https?://\S+$";
const KMS_KEY_ARN_PATTERN: &str = r"^arn:aws[a-z-]*:kms:[a-z0-9-]+:\d{1,12}:(key|alias)/[A-Za-z0-9/_-]+$";
const LAUNCHER_ARTIFACT_PATTERN: &str = r"^(s3://[a-z0-9][a-z0-9.-]*[a-z0-9]/\S+|\S+\.zip)$";
const KAFKA_BOOTSTRAP_PATTERN: &str = r"^[A-Za-z0-9.-]+:\d{1,5}(,[A-Za-z0-9.-]+:\d{1,5})*$";
const CHANNEL_NAME_PATTERN: &str = r"^[A-Za-z0-9._-]+$";

rule_regex!(PROJECT_NAME, PROJECT_NAME_PATTERN);
rule_regex!(REGION, REGION_PATTERN);
rule_regex!(ACCOUNT_ID, ACCOUNT_ID_PATTERN);
rule_regex!(VPC_ID, VPC_ID_PATTERN);
rule_regex!(SUBNET_ID, SUBNET_ID_PATTERN);
rule_regex!(SECURITY_GROUP_ID, SECURITY_GROUP_ID_PATTERN);
rule_regex!(S3_URI, S3_URI_PATTERN);
rule_regex!(ECR_IMAGE, ECR_IMAGE_PATTERN);
rule_regex!(INSTANCE_TYPE, INSTANCE_TYPE_PATTERN);
rule_regex!(S3_BUCKET_ARN, S3_BUCKET_ARN_PATTERN);
rule_regex!(MLFLOW_SERVER_ARN, MLFLOW_SERVER_ARN_PATTERN);
rule_regex!(HTTP_URI, HTTP_URI_PATTERN);
rule_regex!(KMS_KEY_ARN, KMS_KEY_ARN_PATTERN);
rule_regex!(LAUNCHER_ARTIFACT, LAUNCHER_ARTIFACT_PATTERN);
rule_regex!(KAFKA_BOOTSTRAP, KAFKA_BOOTSTRAP_PATTERN);
rule_regex!(CHANNEL_NAME, CHANNEL_NAME_PATTERN);

/// A named format rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    ProjectName,
    Region,
    AccountId,
    VpcId,
    SubnetId,
    SecurityGroupId,
    S3Uri,
    EcrImage,
    InstanceType,
    S3BucketArn,
    MlflowServerArn,
    HttpUri,
    KmsKeyArn,
    LauncherArtifact,
    KafkaBootstrap,
    ChannelName,
}

impl Rule {
    /// Pattern text shown in error messages
    pub fn pattern(self) -> &'static str {
        match self {
            Self::ProjectName => PROJECT_NAME_PATTERN,
            Self::Region => REGION_PATTERN,
            Self::AccountId => ACCOUNT_ID_PATTERN,
            Self::VpcId => VPC_ID_PATTERN,
            Self::SubnetId => SUBNET_ID_PATTERN,
            Self::SecurityGroupId => SECURITY_GROUP_ID_PATTERN,
            Self::S3Uri => S3_URI_PATTERN,
            Self::EcrImage => ECR_IMAGE_PATTERN,
            Self::InstanceType => INSTANCE_TYPE_PATTERN,
            Self::S3BucketArn => S3_BUCKET_ARN_PATTERN,
            Self::MlflowServerArn => MLFLOW_SERVER_ARN_PATTERN,
            Self::HttpUri => HTTP_URI_PATTERN,
            Self::KmsKeyArn => KMS_KEY_ARN_PATTERN,
            Self::LauncherArtifact => LAUNCHER_ARTIFACT_PATTERN,
            Self::KafkaBootstrap => KAFKA_BOOTSTRAP_PATTERN,
            Self::ChannelName => CHANNEL_NAME_PATTERN,
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Self::ProjectName => &PROJECT_NAME,
            Self::Region => &REGION,
            Self::AccountId => &ACCOUNT_ID,
            Self::VpcId => &VPC_ID,
            Self::SubnetId => &SUBNET_ID,
            Self::SecurityGroupId => &SECURITY_GROUP_ID,
            Self::S3Uri => &S3_URI,
            Self::EcrImage => &ECR_IMAGE,
            Self::InstanceType => &INSTANCE_TYPE,
            Self::S3BucketArn => &S3_BUCKET_ARN,
            Self::MlflowServerArn => &MLFLOW_SERVER_ARN,
            Self::HttpUri => &HTTP_URI,
            Self::KmsKeyArn => &KMS_KEY_ARN,
            Self::LauncherArtifact => &LAUNCHER_ARTIFACT,
            Self::KafkaBootstrap => &KAFKA_BOOTSTRAP,
            Self::ChannelName => &CHANNEL_NAME,
        }
    }

    pub fn matches(self, value: &str) -> bool {
        self.regex().is_match(value)
    }

    /// FormatError naming `field` when `value` does not match
    pub fn check(self, field: &str, value: &str) -> Result<(), ValidationError> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(ValidationError::format(field, value, self.pattern()))
        }
    }
}

/// Account id embedded in an ECR image URI
pub fn ecr_account(uri: &str) -> Option<&str> {
    ECR_IMAGE
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Bucket name of an `arn:aws:s3:::bucket` ARN
pub fn bucket_from_arn(arn: &str) -> Option<&str> {
    arn.rsplit_once(":::").map(|(_, bucket)| bucket)
}
