//! CLI argument structures
//!
//! The main CLI structure and all subcommand definitions.

use crate::compose::PipelineKind;
use crate::iam::RoleKind;
use crate::output::OutputFormat;
use crate::schedule::ScheduleState;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Compose SageMaker pipelines, IAM policies and schedules from one config
#[derive(Parser)]
#[command(name = "sm-composer")]
#[command(about = "sm-composer - Compose SageMaker pipeline deployments from a validated platform config", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a platform config and report every violated field
    #[command(name = "validate")]
    Validate {
        /// Platform config file (YAML, JSON or TOML)
        #[arg(short = 'c', long)]
        config: PathBuf,
    },

    /// Compose pipeline definitions, role policies and schedule records
    #[command(name = "compose")]
    Compose {
        /// Platform config file (YAML, JSON or TOML)
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Directory to write documents into
        #[arg(short = 'o', long, default_value = "out")]
        output: PathBuf,

        /// Document format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// List the documents that would be written without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print one role's policy document
    #[command(name = "policy")]
    Policy {
        /// Platform config file (YAML, JSON or TOML)
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Role to print
        #[arg(long, value_enum)]
        role: RoleKind,

        /// Document format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Build a one-off CreateTrainingJob or CreateProcessingJob request
    #[command(name = "launch")]
    Launch {
        /// Platform config file (YAML, JSON or TOML)
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Pipeline to launch
        #[arg(long, value_enum)]
        pipeline: PipelineKind,

        /// Write the request here instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Operate on rendered schedule records
    #[command(name = "schedule")]
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Enable or disable a rendered schedule record in place
    SetState {
        /// Schedule record written by `compose`
        record: PathBuf,

        /// State to declare
        #[arg(long, value_enum)]
        state: ScheduleState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compose() {
        let cli = Cli::try_parse_from([
            "sm-composer",
            "-vv",
            "compose",
            "-c",
            "platform.yaml",
            "--format",
            "yaml",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Compose {
                config,
                output,
                format,
                dry_run,
            } => {
                assert_eq!(config, PathBuf::from("platform.yaml"));
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(format, OutputFormat::Yaml);
                assert!(dry_run);
            }
            _ => panic!("expected compose"),
        }
    }

    #[test]
    fn test_parse_value_enums() {
        let cli = Cli::try_parse_from([
            "sm-composer",
            "policy",
            "-c",
            "p.yaml",
            "--role",
            "pipeline-execution",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Policy {
                role: RoleKind::PipelineExecution,
                ..
            }
        ));

        let cli = Cli::try_parse_from([
            "sm-composer",
            "schedule",
            "set-state",
            "schedules/training.json",
            "--state",
            "enabled",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Schedule {
                command: ScheduleCommands::SetState {
                    state: ScheduleState::Enabled,
                    ..
                }
            }
        ));

        assert!(Cli::try_parse_from([
            "sm-composer",
            "launch",
            "-c",
            "p.yaml",
            "--pipeline",
            "inference",
        ])
        .is_err());
    }
}
