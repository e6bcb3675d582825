use super::expression::ScheduleExpression;
use crate::compose::{ComposedPipeline, JobSpec, PipelineKind};
use crate::config::ProjectContext;
use crate::error::{ComposerError, ErrorCode, ValidationError};
use crate::features::ResourceGroups;
use crate::iam::RoleKind;
use crate::launch::LaunchEvent;
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

/// Declared state of a schedule. There is no running state; execution
/// belongs to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleState {
    Enabled,
    Disabled,
}

impl ScheduleState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
        })
    }
}

/// How the scheduler starts the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Invocation {
    /// StartPipelineExecution on the pipeline
    Pipeline,
    /// Invoke the launcher function, which creates the job directly
    Launcher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineParameterValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SageMakerPipelineParameters {
    pub pipeline_parameter_list: Vec<PipelineParameterValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleTarget {
    pub arn: String,
    pub role_arn: String,
    #[serde(
        default,
        rename = "SageMakerPipelineParameters",
        skip_serializing_if = "Option::is_none"
    )]
    pub sagemaker_pipeline_parameters: Option<SageMakerPipelineParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlexibleTimeWindow {
    pub mode: String,
}

/// EventBridge Scheduler `CreateSchedule` document; also the on-disk
/// schedule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleDocument {
    pub name: String,
    pub description: String,
    pub schedule_expression: ScheduleExpression,
    pub state: ScheduleState,
    pub flexible_time_window: FlexibleTimeWindow,
    pub target: ScheduleTarget,
}

impl ScheduleDocument {
    /// Flip the declared state; returns whether it changed
    pub fn set_state(&mut self, state: ScheduleState) -> bool {
        let changed = self.state != state;
        self.state = state;
        changed
    }

    /// Read a record previously written as JSON or YAML
    pub fn parse(content: &str, format: OutputFormat) -> Result<Self, ComposerError> {
        format.parse(content).map_err(|e| {
            ComposerError::schedule(
                ErrorCode::SCHEDULE_INVALID_RECORD,
                "Not a schedule record",
            )
            .with_source(e)
        })
    }
}

/// A schedule expression bound to a composed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleBinding {
    pub name: String,
    pub expression: ScheduleExpression,
    pub state: ScheduleState,
    pub target: JobSpec,
    pub invocation: Invocation,
    pub target_arn: String,
    pub role_arn: String,
}

impl ScheduleBinding {
    pub fn kind(&self) -> PipelineKind {
        self.target.kind
    }

    /// Returns whether the state changed
    pub fn enable(&mut self) -> bool {
        self.set_state(ScheduleState::Enabled)
    }

    /// Returns whether the state changed
    pub fn disable(&mut self) -> bool {
        self.set_state(ScheduleState::Disabled)
    }

    pub fn set_state(&mut self, state: ScheduleState) -> bool {
        if self.state == state {
            debug!("Schedule {} already {}", self.name, state);
            return false;
        }
        info!("Schedule {}: {} -> {}", self.name, self.state, state);
        self.state = state;
        true
    }

    /// Parameter list sent when the schedule fires
    pub fn trigger_payload(&self) -> Vec<PipelineParameterValue> {
        self.target
            .pipeline_parameters()
            .into_iter()
            .map(|(name, value)| PipelineParameterValue { name, value })
            .collect()
    }

    pub fn to_rule_document(&self) -> Result<ScheduleDocument, ComposerError> {
        let target = match self.invocation {
            Invocation::Pipeline => ScheduleTarget {
                arn: self.target_arn.clone(),
                role_arn: self.role_arn.clone(),
                sagemaker_pipeline_parameters: Some(SageMakerPipelineParameters {
                    pipeline_parameter_list: self.trigger_payload(),
                }),
                input: None,
            },
            Invocation::Launcher => ScheduleTarget {
                arn: self.target_arn.clone(),
                role_arn: self.role_arn.clone(),
                sagemaker_pipeline_parameters: None,
                input: Some(
                    serde_json::to_string(&LaunchEvent::for_job(&self.target))
                        .map_err(|e| ComposerError::serialization("launch event", e))?,
                ),
            },
        };

        Ok(ScheduleDocument {
            name: self.name.clone(),
            description: format!("Scheduled {} run of {}", self.kind(), self.target.name),
            schedule_expression: self.expression.clone(),
            state: self.state,
            flexible_time_window: FlexibleTimeWindow {
                mode: "OFF".to_string(),
            },
            target,
        })
    }
}

/// `{project}-{environment}-{kind}-schedule`
pub fn schedule_name(context: &ProjectContext, kind: PipelineKind) -> String {
    context.resource_name(&format!("{}-schedule", kind))
}

/// Function name of the custom launcher
pub fn launcher_function_name(context: &ProjectContext) -> String {
    context.resource_name("training-launcher")
}

/// Holds at most one binding per pipeline kind
#[derive(Debug, Clone)]
pub struct ScheduleBook {
    context: ProjectContext,
    enabled_kinds: BTreeSet<PipelineKind>,
    launcher_arn: Option<String>,
    initial_state: ScheduleState,
    bindings: BTreeMap<PipelineKind, ScheduleBinding>,
}

impl ScheduleBook {
    pub fn new(context: &ProjectContext, groups: &ResourceGroups) -> Self {
        let launcher_arn = groups.launcher.as_ref().map(|_| {
            context.arn(
                "lambda",
                &format!("function:{}", launcher_function_name(context)),
            )
        });
        Self {
            context: context.clone(),
            enabled_kinds: groups.enabled_kinds().into_iter().collect(),
            launcher_arn,
            initial_state: ScheduleState::from_enabled(
                groups.scheduling.as_ref().is_some_and(|s| s.enabled),
            ),
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `expression` to `pipeline`, returning the kind's previous binding
    pub fn bind(
        &mut self,
        pipeline: &ComposedPipeline,
        expression: ScheduleExpression,
    ) -> Result<Option<ScheduleBinding>, ValidationError> {
        let kind = pipeline.kind();
        if !self.enabled_kinds.contains(&kind) {
            return Err(ValidationError::dependency(
                kind.flag_name(),
                format!("binding a {} schedule", kind),
            ));
        }

        let (invocation, target_arn) = match (&self.launcher_arn, kind) {
            (Some(launcher), PipelineKind::Training) => (Invocation::Launcher, launcher.clone()),
            _ => (Invocation::Pipeline, pipeline.pipeline_arn.clone()),
        };

        let binding = ScheduleBinding {
            name: schedule_name(&self.context, kind),
            expression,
            state: self.initial_state,
            target: pipeline.job.clone(),
            invocation,
            target_arn,
            role_arn: RoleKind::Scheduler.arn(&self.context),
        };
        let previous = self.bindings.insert(kind, binding);
        if previous.is_some() {
            info!("Replaced {} schedule binding", kind);
        }
        Ok(previous)
    }

    pub fn get(&self, kind: PipelineKind) -> Option<&ScheduleBinding> {
        self.bindings.get(&kind)
    }

    pub fn get_mut(&mut self, kind: PipelineKind) -> Option<&mut ScheduleBinding> {
        self.bindings.get_mut(&kind)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduleBinding> {
        self.bindings.values()
    }

    pub fn into_bindings(self) -> Vec<ScheduleBinding> {
        self.bindings.into_values().collect()
    }
}
