//! Plan assembly
//!
//! Runs the resolver, feature evaluator, composer, schedule binder and policy
//! synthesizer in order. Every stage keeps going past errors so that a failed
//! plan reports every violated field at once; a plan is only returned when
//! nothing failed.

use crate::compose::{compose_kind, ComposedPipeline, PipelineKind};
use crate::config::{resolve_lenient, PlatformInput, ProjectContext, ResolvedConfig};
use crate::error::{collect_into, ComposeValidation, ValidationError, ValidationErrors};
use crate::features::{evaluate_lenient, ResourceGroups};
use crate::iam::{synthesize, PolicyWarning, RoleKind, SynthesizedPolicies};
use crate::schedule::{Invocation, ScheduleBinding, ScheduleBook, ScheduleState};
use serde::Serialize;
use stillwater::Validation;
use tracing::{debug, info};

/// Everything composed for one deployment
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub context: ProjectContext,
    pub groups: ResourceGroups,
    pub pipelines: Vec<ComposedPipeline>,
    pub policies: SynthesizedPolicies,
    pub schedules: Vec<ScheduleBinding>,
}

impl Plan {
    pub fn pipeline(&self, kind: PipelineKind) -> Option<&ComposedPipeline> {
        self.pipelines.iter().find(|p| p.kind() == kind)
    }

    pub fn training(&self) -> Option<&ComposedPipeline> {
        self.pipeline(PipelineKind::Training)
    }

    pub fn processing(&self) -> Option<&ComposedPipeline> {
        self.pipeline(PipelineKind::Processing)
    }

    pub fn schedule(&self, kind: PipelineKind) -> Option<&ScheduleBinding> {
        self.schedules.iter().find(|s| s.kind() == kind)
    }

    pub fn warnings(&self) -> &[PolicyWarning] {
        &self.policies.warnings
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            project_name: self.context.project_name.clone(),
            environment: self.context.environment.to_string(),
            region: self.context.region.clone(),
            account_id: self.context.account_id.clone(),
            groups: self
                .groups
                .summary()
                .into_iter()
                .map(str::to_string)
                .collect(),
            pipelines: self
                .pipelines
                .iter()
                .map(|p| PipelineSummary {
                    kind: p.kind(),
                    pipeline_name: p.pipeline_name.clone(),
                    pipeline_arn: p.pipeline_arn.clone(),
                    role_arn: p.job.role_arn.clone(),
                })
                .collect(),
            roles: self
                .policies
                .roles
                .iter()
                .map(|r| RoleSummary {
                    role: r.role,
                    role_name: r.role_name.clone(),
                    role_arn: r.role_arn.clone(),
                    statements: r.policy.statements.len(),
                })
                .collect(),
            schedules: self
                .schedules
                .iter()
                .map(|s| ScheduleSummary {
                    kind: s.kind(),
                    name: s.name.clone(),
                    expression: s.expression.to_string(),
                    state: s.state,
                    invocation: s.invocation,
                })
                .collect(),
            warnings: self.warnings().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub kind: PipelineKind,
    pub pipeline_name: String,
    pub pipeline_arn: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub role: RoleKind,
    pub role_name: String,
    pub role_arn: String,
    pub statements: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub kind: PipelineKind,
    pub name: String,
    pub expression: String,
    pub state: ScheduleState,
    pub invocation: Invocation,
}

/// Contents of `plan.json`
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub project_name: String,
    pub environment: String,
    pub region: String,
    pub account_id: Option<String>,
    pub groups: Vec<String>,
    pub pipelines: Vec<PipelineSummary>,
    pub roles: Vec<RoleSummary>,
    pub schedules: Vec<ScheduleSummary>,
    pub warnings: Vec<PolicyWarning>,
}

fn bind_schedules(
    resolved: &ResolvedConfig,
    groups: &ResourceGroups,
    pipelines: &[ComposedPipeline],
    errors: &mut Vec<ValidationError>,
) -> Vec<ScheduleBinding> {
    let Some(scheduling) = &groups.scheduling else {
        return Vec::new();
    };
    let mut book = ScheduleBook::new(&resolved.context, groups);
    for pipeline in pipelines {
        let Some(expression) = scheduling.expression_for(pipeline.kind()) else {
            continue;
        };
        if let Err(err) = book.bind(pipeline, expression.clone()) {
            errors.push(err);
        }
    }
    book.into_bindings()
}

/// Resolve, evaluate, compose, bind and synthesize, collecting every issue
pub fn assemble(input: &PlatformInput) -> ComposeValidation<Plan> {
    let (resolved, mut errors) = resolve_lenient(input);
    let (groups, group_errors) = evaluate_lenient(&resolved);
    errors.extend(group_errors);

    let pipelines: Vec<ComposedPipeline> = groups
        .enabled_kinds()
        .into_iter()
        .filter_map(|kind| collect_into(&mut errors, compose_kind(&resolved, &groups, kind)))
        .collect();

    let schedules = bind_schedules(&resolved, &groups, &pipelines, &mut errors);

    let policies = match synthesize(&resolved, &groups) {
        Validation::Success(policies) => policies,
        Validation::Failure(policy_errors) => {
            // strict_iam is already reported by the evaluator
            for err in policy_errors {
                if !errors.contains(&err) {
                    errors.push(err);
                }
            }
            SynthesizedPolicies::default()
        }
    };

    if !errors.is_empty() {
        debug!("Plan failed with {} issue(s)", errors.len());
        return Validation::failure(errors);
    }

    info!(
        "Planned {}: {} pipeline(s), {} role(s), {} schedule(s)",
        resolved.context.prefix(),
        pipelines.len(),
        policies.roles.len(),
        schedules.len()
    );
    Validation::success(Plan {
        context: resolved.context,
        groups,
        pipelines,
        policies,
        schedules,
    })
}

/// Build the plan, failing with every issue found
pub fn build_plan(input: &PlatformInput) -> Result<Plan, ValidationErrors> {
    assemble(input).into_result().map_err(ValidationErrors::from)
}

/// Validate only; returns every issue without building documents
pub fn validate(input: &PlatformInput) -> Result<(), ValidationErrors> {
    build_plan(input).map(|_| ())
}
