//! Policy command implementation

use super::load_plan;
use crate::error::ComposerError;
use crate::iam::RoleKind;
use crate::output::{write_output, OutputFormat};
use anyhow::Result;
use std::path::Path;

/// Print the permissions policy of `role`
pub async fn run_policy_command(
    config: &Path,
    role: RoleKind,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan(config).await?;
    let role_policy = plan.policies.get(role).ok_or_else(|| {
        let present: Vec<String> = plan
            .policies
            .roles
            .iter()
            .map(|r| r.role.to_string())
            .collect();
        ComposerError::other(format!(
            "Role '{}' is not part of this deployment (roles: {})",
            role,
            present.join(", ")
        ))
    })?;

    for warning in plan.warnings().iter().filter(|w| w.role == role) {
        eprintln!("⚠️  {}: {}", warning.sid, warning.message);
    }

    write_output(None, &format.render(&role_policy.policy)?).await?;
    Ok(())
}
