//! Config commands

use std::path::Path;

use anyhow::Result;

use crate::config::CliConfig;
use crate::output::OutputFormat;
use crate::ConfigCommands;

pub fn handle(
    action: ConfigCommands,
    path: Option<&Path>,
    current: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    match action {
        ConfigCommands::Init => {
            let written = CliConfig::default().save(path)?;
            println!("Configuration initialized at {}", written.display());
        }
        ConfigCommands::Show => format.print(current)?,
    }
    Ok(())
}
