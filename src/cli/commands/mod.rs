//! Command implementation modules
//!
//! Each command loads the platform config, builds a plan and renders the
//! part of it the command is about.

pub mod compose;
pub mod launch;
pub mod policy;
pub mod schedule;
pub mod validate;

pub use compose::{run_compose_command, ComposeParams};
pub use launch::run_launch_command;
pub use policy::run_policy_command;
pub use schedule::run_schedule_command;
pub use validate::run_validate_command;

use crate::config::ConfigLoader;
use crate::error::ComposerError;
use crate::plan::{build_plan, Plan};
use anyhow::Result;
use std::path::Path;

/// Load `config` and build its plan, failing with every validation issue
pub(crate) async fn load_plan(config: &Path) -> Result<Plan> {
    let input = ConfigLoader::new(config).load().await?;
    let plan = build_plan(&input).map_err(ComposerError::validation)?;
    Ok(plan)
}

/// Print degraded-mode policy warnings to stderr
pub(crate) fn print_warnings(plan: &Plan) {
    for warning in plan.warnings() {
        eprintln!("⚠️  {} ({}): {}", warning.role, warning.sid, warning.message);
    }
}
