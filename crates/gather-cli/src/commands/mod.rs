//! CLI Commands

pub mod config;
pub mod envelope;
pub mod membership;
pub mod seed;
pub mod validate;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use gather_tenant::FlatDocument;
use serde_json::Value;

/// Read a JSON or YAML document from `file`, or JSON from stdin.
pub fn read_input(file: Option<&Path>) -> Result<Value> {
    match file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_input(&content, is_yaml(path))
        }
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("reading stdin")?;
            parse_input(&content, false)
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

pub fn parse_input(content: &str, yaml: bool) -> Result<Value> {
    let value = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };
    Ok(value)
}

/// A single object or an array of objects.
pub fn documents(input: Value) -> Result<Vec<FlatDocument>> {
    match input {
        Value::Object(document) => Ok(vec![document]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(document) => Ok(document),
                _ => bail!("item {} is not an object", index),
            })
            .collect(),
        _ => bail!("input must be an object or an array of objects"),
    }
}
