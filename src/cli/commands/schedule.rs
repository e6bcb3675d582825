//! Schedule command implementation
//!
//! The declared state is the only part of a rendered schedule record that
//! may change after composition.

use crate::cli::args::ScheduleCommands;
use crate::error::ComposerError;
use crate::output::{write_output, OutputFormat};
use crate::schedule::{ScheduleDocument, ScheduleState};
use anyhow::Result;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub async fn run_schedule_command(command: ScheduleCommands) -> Result<()> {
    match command {
        ScheduleCommands::SetState { record, state } => set_state(&record, state).await,
    }
}

async fn set_state(record: &Path, state: ScheduleState) -> Result<()> {
    let format = OutputFormat::from_path(record);
    let content = fs::read_to_string(record)
        .await
        .map_err(|e| ComposerError::from(e).with_path(record))?;
    let mut document = ScheduleDocument::parse(&content, format)
        .map_err(|e| e.with_context(record.display()))?;

    if !document.set_state(state) {
        println!("Schedule {} is already {}", document.name, state);
        return Ok(());
    }

    write_output(Some(record), &format.render(&document)?).await?;
    info!("Schedule {} set to {}", document.name, state);
    println!("✓ Schedule {} is now {}", document.name, state);
    Ok(())
}
