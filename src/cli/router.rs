//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;
use tracing::debug;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { config } => run_validate_command(&config).await,
        Commands::Compose {
            config,
            output,
            format,
            dry_run,
        } => {
            debug!("Composing {} as {:?}", config.display(), format);
            run_compose_command(ComposeParams {
                config,
                output,
                format,
                dry_run,
            })
            .await
        }
        Commands::Policy {
            config,
            role,
            format,
        } => run_policy_command(&config, role, format).await,
        Commands::Launch {
            config,
            pipeline,
            output,
        } => run_launch_command(&config, pipeline, output).await,
        Commands::Schedule { command } => run_schedule_command(command).await,
    }
}
