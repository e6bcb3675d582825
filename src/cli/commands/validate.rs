//! Validate command implementation

use super::{load_plan, print_warnings};
use anyhow::Result;
use std::path::Path;

pub async fn run_validate_command(config: &Path) -> Result<()> {
    let plan = load_plan(config).await?;
    print_warnings(&plan);

    println!("✓ Configuration is valid: {}", config.display());
    println!("  Resource groups: {}", plan.groups.summary().join(", "));
    for pipeline in &plan.pipelines {
        println!("  Pipeline: {}", pipeline.pipeline_name);
    }
    for schedule in &plan.schedules {
        println!(
            "  Schedule: {} {} ({})",
            schedule.name, schedule.expression, schedule.state
        );
    }
    Ok(())
}
