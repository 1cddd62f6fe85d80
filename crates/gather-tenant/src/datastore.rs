//! Document Store
//!
//! Persistence abstraction for flat tenant documents. Every kind lives in
//! one collection per tenant and is told apart by its `datatype` tag.
//! Optimistic concurrency is enforced here: an update must carry the
//! revision currently stored.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{DataType, FlatDocument, DATATYPE_KEY, ID_KEY, REV_KEY, TENANT_ID_KEY};

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no document '{id}' for tenant '{tenant_id}'")]
    NotFound { tenant_id: String, id: String },

    #[error("revision conflict on document '{id}'")]
    RevisionConflict { id: String },

    #[error("document has no identifier")]
    MissingIdentifier,

    #[error("document has no tenant id")]
    MissingTenantId,

    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// `NotFound` for `id` under `tenant_id`
    pub fn not_found(tenant_id: &str, id: &str) -> Self {
        Self::NotFound {
            tenant_id: tenant_id.to_string(),
            id: id.to_string(),
        }
    }
}

/// Storage collaborator for flat documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, tenant_id: &str, id: &str) -> StoreResult<FlatDocument>;

    /// Create or update a document, returning its new revision.
    ///
    /// A document without `_rev` is a create; with `_rev` it is an update
    /// that must match the stored revision.
    async fn put(&self, document: FlatDocument) -> StoreResult<String>;

    /// Remove a document, returning what was stored
    async fn delete(&self, tenant_id: &str, id: &str) -> StoreResult<FlatDocument>;

    /// Every document of one kind for a tenant
    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        datatype: DataType,
    ) -> StoreResult<Vec<FlatDocument>>;
}

fn string_field<'a>(document: &'a FlatDocument, key: &str) -> &'a str {
    document.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Generation number leading a `<generation>-<hex>` revision token.
fn generation(rev: &str) -> u64 {
    rev.split_once('-')
        .and_then(|(gen, _)| gen.parse().ok())
        .unwrap_or(0)
}

fn next_revision(previous: &str) -> String {
    format!("{}-{}", generation(previous) + 1, Uuid::new_v4().simple())
}

/// In-memory document store (for testing and development)
pub struct InMemoryDocumentStore {
    tenants: RwLock<HashMap<String, BTreeMap<String, FlatDocument>>>,
}

impl InMemoryDocumentStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents held for a tenant, of any kind
    pub fn len(&self, tenant_id: &str) -> usize {
        self.tenants.read().get(tenant_id).map_or(0, BTreeMap::len)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, tenant_id: &str, id: &str) -> StoreResult<FlatDocument> {
        self.tenants
            .read()
            .get(tenant_id)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(tenant_id, id))
    }

    async fn put(&self, mut document: FlatDocument) -> StoreResult<String> {
        let tenant_id = string_field(&document, TENANT_ID_KEY).to_string();
        if tenant_id.is_empty() {
            return Err(StoreError::MissingTenantId);
        }
        let id = string_field(&document, ID_KEY).to_string();
        if id.is_empty() {
            return Err(StoreError::MissingIdentifier);
        }
        let rev = string_field(&document, REV_KEY).to_string();

        let mut tenants = self.tenants.write();
        let docs = tenants.entry(tenant_id).or_default();
        let stored_rev = docs.get(&id).map(|doc| string_field(doc, REV_KEY));

        match (rev.is_empty(), stored_rev) {
            (true, None) => {}
            (false, Some(current)) if current == rev => {}
            _ => return Err(StoreError::RevisionConflict { id }),
        }

        let new_rev = next_revision(&rev);
        document.insert(REV_KEY.to_string(), Value::from(new_rev.clone()));
        docs.insert(id, document);
        Ok(new_rev)
    }

    async fn delete(&self, tenant_id: &str, id: &str) -> StoreResult<FlatDocument> {
        self.tenants
            .write()
            .get_mut(tenant_id)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| StoreError::not_found(tenant_id, id))
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        datatype: DataType,
    ) -> StoreResult<Vec<FlatDocument>> {
        let docs = self
            .tenants
            .read()
            .get(tenant_id)
            .map(|docs| {
                docs.values()
                    .filter(|doc| string_field(doc, DATATYPE_KEY) == datatype.as_str())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> FlatDocument {
        value.as_object().cloned().unwrap()
    }

    fn domain(id: &str) -> FlatDocument {
        doc(json!({ "_id": id, "tenantId": "t1", "datatype": "domain", "name": id }))
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = InMemoryDocumentStore::new();

        let rev1 = store.put(domain("d1")).await.unwrap();
        assert!(rev1.starts_with("1-"));
        assert_eq!(rev1.len(), 2 + 32);

        let mut update = store.get("t1", "d1").await.unwrap();
        assert_eq!(update["_rev"], json!(rev1));
        update.insert("name".into(), json!("renamed"));
        let rev2 = store.put(update).await.unwrap();
        assert!(rev2.starts_with("2-"));

        let fetched = store.get("t1", "d1").await.unwrap();
        assert_eq!(fetched["name"], json!("renamed"));
        assert_eq!(fetched["_rev"], json!(rev2));
    }

    #[tokio::test]
    async fn test_revision_conflicts() {
        let store = InMemoryDocumentStore::new();
        let rev1 = store.put(domain("d1")).await.unwrap();

        // Second create of the same id
        let err = store.put(domain("d1")).await.unwrap_err();
        assert_eq!(err, StoreError::RevisionConflict { id: "d1".into() });

        // Stale revision
        let mut stale = domain("d1");
        stale.insert("_rev".into(), json!("1-00000000000000000000000000000000"));
        assert!(matches!(
            store.put(stale).await,
            Err(StoreError::RevisionConflict { .. })
        ));

        // Update of a document that does not exist
        let mut missing = domain("d2");
        missing.insert("_rev".into(), json!(rev1));
        assert!(matches!(
            store.put(missing).await,
            Err(StoreError::RevisionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_put_requires_header() {
        let store = InMemoryDocumentStore::new();
        let err = store.put(doc(json!({ "_id": "x" }))).await.unwrap_err();
        assert_eq!(err, StoreError::MissingTenantId);
        let err = store.put(doc(json!({ "tenantId": "t1" }))).await.unwrap_err();
        assert_eq!(err, StoreError::MissingIdentifier);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store.put(domain("d1")).await.unwrap();

        assert_eq!(
            store.get("t2", "d1").await.unwrap_err(),
            StoreError::not_found("t2", "d1")
        );
        assert!(store.list_by_tenant("t2", DataType::Domain).await.unwrap().is_empty());
        assert!(store.delete("t2", "d1").await.is_err());
        assert_eq!(store.len("t1"), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_datatype() {
        let store = InMemoryDocumentStore::new();
        store.put(domain("d2")).await.unwrap();
        store.put(domain("d1")).await.unwrap();
        store
            .put(doc(json!({ "_id": "mo-1", "tenantId": "t1", "datatype": "monitoredObject" })))
            .await
            .unwrap();

        let domains = store.list_by_tenant("t1", DataType::Domain).await.unwrap();
        let ids: Vec<_> = domains.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!("d1"), json!("d2")]);

        let deleted = store.delete("t1", "d1").await.unwrap();
        assert_eq!(deleted["name"], json!("d1"));
        assert_eq!(store.list_by_tenant("t1", DataType::Domain).await.unwrap().len(), 1);
    }

    #[test]
    fn test_revision_generation() {
        assert_eq!(generation(""), 0);
        assert_eq!(generation("7-abc"), 7);
        assert_eq!(generation("garbage"), 0);
        assert!(next_revision("7-abc").starts_with("8-"));
    }
}
