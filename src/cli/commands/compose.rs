//! Compose command implementation
//!
//! Renders every document of a plan and writes them under one directory.

use super::{load_plan, print_warnings};
use crate::output::{render_plan, write_files, OutputFormat};
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

/// Parameters for the compose command
#[derive(Debug, Clone)]
pub struct ComposeParams {
    pub config: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub dry_run: bool,
}

pub async fn run_compose_command(params: ComposeParams) -> Result<()> {
    let plan = load_plan(&params.config).await?;
    print_warnings(&plan);

    let files = render_plan(&plan, params.format)?;
    debug!("Rendered {} document(s)", files.len());

    if params.dry_run {
        println!("Would write to {}:", params.output.display());
        for file in &files {
            println!("  {}", file.path.display());
        }
        return Ok(());
    }

    write_files(&params.output, &files).await?;
    println!(
        "✓ Composed {} document(s) into {}",
        files.len(),
        params.output.display()
    );
    Ok(())
}
