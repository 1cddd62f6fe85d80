//! Seed command

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gather_tenant::envelope::expand_to_envelope;
use gather_tenant::model::{ID_KEY, TENANT_ID_KEY};
use gather_tenant::{
    DataType, FlatDocument, InMemoryDocumentStore, MembershipReport, MembershipRequest,
    ProvisioningConfig, ProvisioningService, TenantDocument, WireShape,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{documents, read_input};
use crate::config::CliConfig;
use crate::output::OutputFormat;

type ScratchService = ProvisioningService<InMemoryDocumentStore>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub tenant_id: String,
    pub created: Vec<Value>,
    pub membership: MembershipReport,
}

pub async fn handle(
    tenant: &str,
    file: Option<&Path>,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let input = documents(read_input(file)?)?;
    let report = seed(tenant, input, config.provisioning.clone()).await?;
    format.print(&report)
}

/// Referenced kinds go first so reference checks can pass.
fn provisioning_order(datatype: DataType) -> u8 {
    match datatype {
        DataType::Metadata => 0,
        DataType::ThresholdProfile | DataType::IngestionProfile => 1,
        DataType::Domain => 2,
        DataType::User | DataType::MonitoredObject => 3,
    }
}

/// Provision `input` for `tenant` into an empty in-memory store.
///
/// A domain's `_id` in the seed file is a local alias. References to it
/// from users and monitored objects are rewritten to the generated id.
pub async fn seed(
    tenant: &str,
    input: Vec<FlatDocument>,
    config: ProvisioningConfig,
) -> Result<SeedReport> {
    let service = ProvisioningService::new(Arc::new(InMemoryDocumentStore::new()), config);

    let mut decoded = Vec::with_capacity(input.len());
    for (index, mut document) in input.into_iter().enumerate() {
        document.insert(TENANT_ID_KEY.to_string(), Value::from(tenant));
        let document = TenantDocument::from_flat(document)
            .with_context(|| format!("decoding document {}", index))?;
        decoded.push((index, document));
    }
    decoded.sort_by_key(|(_, document)| provisioning_order(document.datatype()));

    let mut aliases = HashMap::new();
    let mut created = Vec::with_capacity(decoded.len());
    for (index, mut document) in decoded {
        resolve_aliases(&mut document, &aliases);
        let envelope = match &document {
            TenantDocument::User(doc) => provision(&service, doc).await,
            TenantDocument::Domain(doc) => provision(&service, doc).await,
            TenantDocument::IngestionProfile(doc) => provision(&service, doc).await,
            TenantDocument::ThresholdProfile(doc) => provision(&service, doc).await,
            TenantDocument::MonitoredObject(doc) => provision(&service, doc).await,
            TenantDocument::Metadata(doc) => provision(&service, doc).await,
        }
        .with_context(|| format!("provisioning document {} ({})", index, document.datatype()))?;

        if let TenantDocument::Domain(domain) = &document {
            if let Some(id) = envelope.get(ID_KEY).and_then(Value::as_str) {
                if !domain.id.is_empty() {
                    aliases.insert(domain.id.clone(), id.to_string());
                }
            }
        }
        created.push(envelope);
    }

    let membership = service
        .monitored_object_domain_map(&MembershipRequest {
            tenant_id: tenant.to_string(),
            ..Default::default()
        })
        .await?;

    info!("Seeded {} documents for tenant {}", created.len(), tenant);
    Ok(SeedReport {
        tenant_id: tenant.to_string(),
        created,
        membership,
    })
}

fn resolve_aliases(document: &mut TenantDocument, aliases: &HashMap<String, String>) {
    let references = match document {
        TenantDocument::User(user) => &mut user.domains,
        TenantDocument::MonitoredObject(object) => &mut object.domain_set,
        _ => return,
    };
    for reference in references.iter_mut() {
        if let Some(id) = aliases.get(reference.as_str()) {
            *reference = id.clone();
        }
    }
}

async fn provision<T: WireShape>(service: &ScratchService, document: &T) -> Result<Value> {
    let created = service.create::<T>(expand_to_envelope(document)?).await?;
    Ok(serde_json::to_value(created)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(value: Value) -> Vec<FlatDocument> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_seed_builds_membership() {
        let input = docs(json!([
            { "datatype": "monitoredObject", "id": "a", "domainSet": ["d1"] },
            { "datatype": "monitoredObject", "id": "b", "domainSet": ["d1"] },
            { "datatype": "monitoredObject", "id": "c", "domainSet": ["d1", "d2"] },
            { "datatype": "tenantMetadata", "tenantName": "Acme" }
        ]));

        let report = seed("t1", input, ProvisioningConfig::default()).await.unwrap();
        assert_eq!(report.created.len(), 4);
        assert_eq!(report.created[0]["data"]["datatype"], "tenantMetadata");
        assert_eq!(report.created[1]["_id"], "a");
        assert_eq!(report.created[1]["data"]["tenantId"], "t1");
        assert_eq!(report.membership.domain_to_count_map["d1"], 3);
        assert_eq!(report.membership.domain_to_count_map["d2"], 1);
    }

    #[tokio::test]
    async fn test_seed_orders_domains_before_references() {
        let config = ProvisioningConfig {
            enforce_domain_references: true,
            ..Default::default()
        };

        let input = docs(json!([
            { "datatype": "monitoredObject", "id": "a", "domainSet": ["d1"] },
            { "datatype": "domain", "name": "Core" }
        ]));
        let err = seed("t1", input, config.clone()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("unknown domain"));

        let input = docs(json!([
            { "datatype": "monitoredObject", "id": "a", "domainSet": ["core"] },
            { "datatype": "user", "username": "ops", "domains": ["core"] },
            { "datatype": "domain", "_id": "core", "name": "Core" }
        ]));
        let report = seed("t1", input, config).await.unwrap();
        assert_eq!(report.created[0]["data"]["datatype"], "domain");

        let domain_id = report.created[0]["_id"].as_str().unwrap();
        assert_ne!(domain_id, "core");
        assert_eq!(report.created[1]["data"]["domainSet"][0], domain_id);
        assert_eq!(report.created[2]["data"]["domains"][0], domain_id);
        assert_eq!(report.membership.domain_to_object_set_map[domain_id], vec!["a"]);
    }

    #[tokio::test]
    async fn test_seed_rejects_unknown_kind() {
        let err = seed("t1", docs(json!([{ "datatype": "widget" }])), ProvisioningConfig::default())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("decoding document 0"));
    }
}
