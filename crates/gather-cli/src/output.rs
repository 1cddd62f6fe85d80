//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        match self {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            // Documents are nested; tables only apply to row output
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data)?)
            }
        }
        Ok(())
    }

    pub fn print_rows<R: Serialize + Tabled>(&self, rows: &[R]) -> Result<()> {
        match self {
            OutputFormat::Table => {
                println!("{}", tabled::Table::new(rows));
                Ok(())
            }
            _ => self.print(&rows),
        }
    }
}
