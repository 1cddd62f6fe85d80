//! Envelope commands

use std::path::Path;

use anyhow::{Context, Result};
use gather_tenant::envelope::{expand, flatten};
use gather_tenant::FlatDocument;
use serde_json::Value;

use super::{documents, read_input};
use crate::output::OutputFormat;
use crate::EnvelopeCommands;

pub fn handle(action: EnvelopeCommands, format: OutputFormat) -> Result<()> {
    let (file, expanding) = match &action {
        EnvelopeCommands::Expand { file } => (file.as_deref(), true),
        EnvelopeCommands::Flatten { file } => (file.as_deref(), false),
    };
    let input = read_input(file)?;
    let output = convert(input, expanding)?;
    format.print(&output)
}

/// Convert every document in `input`, keeping its single/array shape.
fn convert(input: Value, expanding: bool) -> Result<Value> {
    let single = input.is_object();
    let converted = documents(input)?
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            if expanding {
                Ok(expand(document))
            } else {
                flatten(document).with_context(|| format!("document {}", index))
            }
        })
        .collect::<Result<Vec<FlatDocument>>>()?;

    let mut values: Vec<Value> = converted.into_iter().map(Value::Object).collect();
    if single {
        if let Some(only) = values.pop() {
            return Ok(only);
        }
    }
    Ok(Value::Array(values))
}
