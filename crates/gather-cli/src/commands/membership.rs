//! Membership command

use std::path::Path;

use anyhow::{Context, Result};
use gather_tenant::model::from_flat;
use gather_tenant::{build_membership, MembershipReport, MembershipRequest, MonitoredObject};
use serde::Serialize;
use tabled::Tabled;

use super::{documents, read_input};
use crate::output::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
struct CountRow {
    domain: String,
    count: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct ObjectSetRow {
    domain: String,
    count: usize,
    objects: String,
}

pub fn handle(
    tenant: String,
    domains: Vec<String>,
    by_count: bool,
    file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let objects = documents(read_input(file)?)?
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            from_flat::<MonitoredObject>(document)
                .with_context(|| format!("monitored object {}", index))
        })
        .collect::<Result<Vec<_>>>()?;

    let request = MembershipRequest {
        tenant_id: tenant,
        by_count,
        domain_set: domains,
    };
    let report = build_membership(&request, &objects)?;

    match format {
        OutputFormat::Table if by_count => format.print_rows(&count_rows(&report)),
        OutputFormat::Table => format.print_rows(&object_set_rows(&report)),
        _ => format.print(&report),
    }
}

fn count_rows(report: &MembershipReport) -> Vec<CountRow> {
    report
        .domain_to_count_map
        .iter()
        .map(|(domain, count)| CountRow {
            domain: domain.clone(),
            count: *count,
        })
        .collect()
}

fn object_set_rows(report: &MembershipReport) -> Vec<ObjectSetRow> {
    report
        .domain_to_object_set_map
        .iter()
        .map(|(domain, objects)| ObjectSetRow {
            domain: domain.clone(),
            count: objects.len(),
            objects: objects.join(", "),
        })
        .collect()
}
