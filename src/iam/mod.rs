//! IAM policy synthesizer
//!
//! Produces the intended role policies for the provisioning layer to apply.
//! Nothing here talks to IAM.

pub mod roles;
pub mod statement;

pub use roles::{
    ecr_repository_arn, synthesize, PolicyWarning, RoleKind, RolePolicy, SynthesizedPolicies,
};
pub use statement::{Effect, PolicyDocument, PolicyStatement, TrustPolicy, POLICY_VERSION};
