//! Validate command

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use gather_tenant::model::{DATATYPE_KEY, ID_KEY};
use gather_tenant::{FlatDocument, TenantDocument};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use super::{documents, read_input};
use crate::output::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
pub struct ValidationRow {
    pub index: usize,
    pub datatype: String,
    pub id: String,
    pub valid: bool,
    pub error: String,
}

pub fn handle(file: Option<&Path>, update: bool, format: OutputFormat) -> Result<()> {
    let rows: Vec<ValidationRow> = documents(read_input(file)?)?
        .into_iter()
        .enumerate()
        .map(|(index, document)| check(index, document, update))
        .collect();
    format.print_rows(&rows)?;

    let failed = rows.iter().filter(|row| !row.valid).count();
    if failed > 0 {
        eprintln!("{}", format!("{} of {} documents invalid", failed, rows.len()).red());
        bail!("validation failed");
    }
    eprintln!("{}", format!("{} documents valid", rows.len()).green());
    Ok(())
}

fn text_field(document: &FlatDocument, key: &str) -> String {
    document
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn check(index: usize, document: FlatDocument, update: bool) -> ValidationRow {
    let id = text_field(&document, ID_KEY);
    let datatype = text_field(&document, DATATYPE_KEY);
    let error = match TenantDocument::from_flat(document) {
        Ok(decoded) => decoded.validate(update).err().map(|e| e.to_string()),
        Err(e) => Some(e.to_string()),
    };
    ValidationRow {
        index,
        datatype,
        id,
        valid: error.is_none(),
        error: error.unwrap_or_default(),
    }
}
