//! Feature toggle evaluation
//!
//! Decides which optional resource groups exist for a resolved configuration.
//! Each group is an `Option`; a flag that is on but lacks a value it depends
//! on is a DependencyError rather than a silently skipped group.

use crate::compose::PipelineKind;
use crate::config::{ExpressionSetting, ResolvedConfig, ResourceReference, ResourceReferences};
use crate::error::{validated, ComposeValidation, ValidationError};
use crate::schedule::ScheduleExpression;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingGroup {
    pub image: ResourceReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingGroup {
    pub image: ResourceReference,
    pub input: ResourceReference,
    pub output: ResourceReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingGroup {
    pub training_expression: Option<ScheduleExpression>,
    pub processing_expression: Option<ScheduleExpression>,
    pub enabled: bool,
}

impl SchedulingGroup {
    /// Expression bound to `kind`; `None` when the kind is not scheduled
    pub fn expression_for(&self, kind: PipelineKind) -> Option<&ScheduleExpression> {
        match kind {
            PipelineKind::Training => self.training_expression.as_ref(),
            PipelineKind::Processing => self.processing_expression.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LauncherGroup {
    pub artifact_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcGroup {
    pub vpc: Option<ResourceReference>,
    pub subnets: Vec<ResourceReference>,
    pub security_groups: Vec<ResourceReference>,
}

impl VpcGroup {
    pub fn subnet_ids(&self) -> Vec<String> {
        self.subnets.iter().map(|s| s.identifier.clone()).collect()
    }

    pub fn security_group_ids(&self) -> Vec<String> {
        self.security_groups
            .iter()
            .map(|s| s.identifier.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MlflowGroup {
    pub server: Option<ResourceReference>,
    pub tracking_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotGroup {
    pub max_wait_time_seconds: Option<u64>,
}

/// The concrete set of resource groups to materialize
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceGroups {
    pub training: Option<TrainingGroup>,
    pub processing: Option<ProcessingGroup>,
    pub scheduling: Option<SchedulingGroup>,
    pub launcher: Option<LauncherGroup>,
    pub vpc: Option<VpcGroup>,
    pub mlflow: Option<MlflowGroup>,
    pub spot: Option<SpotGroup>,
    pub network_isolation: bool,
}

impl ResourceGroups {
    pub fn is_enabled(&self, kind: PipelineKind) -> bool {
        match kind {
            PipelineKind::Training => self.training.is_some(),
            PipelineKind::Processing => self.processing.is_some(),
        }
    }

    pub fn enabled_kinds(&self) -> Vec<PipelineKind> {
        PipelineKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Names of the groups that will be materialized
    pub fn summary(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.training.is_some() {
            names.push("training");
        }
        if self.processing.is_some() {
            names.push("processing");
        }
        if self.scheduling.is_some() {
            names.push("scheduling");
        }
        if self.launcher.is_some() {
            names.push("launcher");
        }
        if self.vpc.is_some() {
            names.push("vpc");
        }
        if self.mlflow.is_some() {
            names.push("mlflow");
        }
        if self.spot.is_some() {
            names.push("spot");
        }
        if self.network_isolation {
            names.push("network_isolation");
        }
        names
    }
}

fn require(
    errors: &mut Vec<ValidationError>,
    reference: &Option<ResourceReference>,
    field: &str,
    required_by: &str,
) -> Option<ResourceReference> {
    if reference.is_none() {
        errors.push(ValidationError::dependency(field, required_by));
    }
    reference.clone()
}

fn evaluate_vpc(refs: &ResourceReferences, errors: &mut Vec<ValidationError>) -> Option<VpcGroup> {
    match (refs.subnets.is_empty(), refs.security_groups.is_empty()) {
        (true, true) => None,
        (false, false) => Some(VpcGroup {
            vpc: refs.vpc.clone(),
            subnets: refs.subnets.clone(),
            security_groups: refs.security_groups.clone(),
        }),
        (false, true) => {
            errors.push(ValidationError::dependency(
                "security_group_ids",
                "subnet_ids is set",
            ));
            None
        }
        (true, false) => {
            errors.push(ValidationError::dependency(
                "subnet_ids",
                "security_group_ids is set",
            ));
            None
        }
    }
}

/// Materialize resource groups, failing with every missing dependency
pub fn evaluate(resolved: &ResolvedConfig) -> ComposeValidation<ResourceGroups> {
    let (groups, errors) = evaluate_lenient(resolved);
    validated(groups, errors)
}

/// Materialize every group whose dependencies are met and report the rest.
///
/// Groups with a missing dependency are left out, so callers can keep
/// validating what remains.
pub fn evaluate_lenient(resolved: &ResolvedConfig) -> (ResourceGroups, Vec<ValidationError>) {
    let flags = &resolved.flags;
    let refs = &resolved.references;
    let settings = &resolved.settings;
    let mut errors = Vec::new();

    let training = if flags.training_enabled {
        require(
            &mut errors,
            &refs.training_image,
            "training_image_uri",
            "enable_training_pipeline is true",
        )
        .map(|image| TrainingGroup { image })
    } else {
        None
    };

    let processing = if flags.processing_enabled {
        let by = "enable_processing_pipeline is true";
        let image = require(&mut errors, &refs.inference_image, "inference_image_uri", by);
        let input = require(
            &mut errors,
            &refs.inference_input,
            "inference_input_s3_path",
            by,
        );
        let output = require(
            &mut errors,
            &refs.inference_output,
            "inference_output_s3_path",
            by,
        );
        match (image, input, output) {
            (Some(image), Some(input), Some(output)) => Some(ProcessingGroup {
                image,
                input,
                output,
            }),
            _ => None,
        }
    } else {
        None
    };

    let scheduling = if flags.scheduling_enabled {
        let by = "enable_scheduling is true";
        if !flags.any_pipeline() {
            errors.push(ValidationError::dependency("enable_training_pipeline", by));
        }
        let schedule = &settings.schedule;
        let processing_only = flags.processing_enabled && !flags.training_enabled;
        let covered = schedule.training_expression.is_some()
            || (processing_only && schedule.processing_expression.is_some());
        if covered {
            let shared = schedule.training_expression.as_ref();
            Some(SchedulingGroup {
                training_expression: shared
                    .filter(|_| flags.training_enabled)
                    .and_then(ExpressionSetting::parsed)
                    .cloned(),
                processing_expression: schedule
                    .processing_expression
                    .as_ref()
                    .or(shared)
                    .filter(|_| flags.processing_enabled)
                    .and_then(ExpressionSetting::parsed)
                    .cloned(),
                enabled: schedule.enabled,
            })
        } else {
            errors.push(ValidationError::dependency("schedule_expression", by));
            None
        }
    } else {
        None
    };

    if flags.custom_launcher_enabled && !flags.training_enabled {
        errors.push(ValidationError::dependency(
            "enable_training_pipeline",
            "enable_custom_launcher is true",
        ));
    }

    let launcher = if flags.custom_launcher_enabled && flags.scheduling_enabled {
        match &settings.schedule.launcher_artifact_path {
            Some(path) => Some(LauncherGroup {
                artifact_path: path.clone(),
            }),
            None => {
                errors.push(ValidationError::dependency(
                    "launcher_artifact_path",
                    "enable_scheduling and enable_custom_launcher are true",
                ));
                None
            }
        }
    } else {
        if flags.custom_launcher_enabled {
            debug!("Custom launcher enabled without scheduling; no launcher group");
        }
        None
    };

    let spot = if flags.spot_enabled {
        if !flags.training_enabled {
            errors.push(ValidationError::dependency(
                "enable_training_pipeline",
                "enable_spot_training is true",
            ));
        }
        Some(SpotGroup {
            max_wait_time_seconds: settings.training.max_wait_time_seconds,
        })
    } else {
        None
    };

    let vpc = evaluate_vpc(refs, &mut errors);

    let mlflow = match (&refs.mlflow_server, &settings.mlflow_tracking_uri) {
        (None, None) => None,
        (server, uri) => Some(MlflowGroup {
            server: server.clone(),
            tracking_uri: uri
                .clone()
                .or_else(|| server.as_ref().map(|s| s.identifier.clone()))
                .unwrap_or_default(),
        }),
    };

    if settings.strict_iam && flags.any_pipeline() && refs.bucket.is_none() {
        errors.push(ValidationError::dependency("s3_bucket_arn", "strict_iam is true"));
    }

    let groups = ResourceGroups {
        training,
        processing,
        scheduling,
        launcher,
        vpc,
        mlflow,
        spot,
        network_isolation: flags.network_isolation_enabled,
    };
    debug!("Resource groups: {:?}", groups.summary());
    (groups, errors)
}
