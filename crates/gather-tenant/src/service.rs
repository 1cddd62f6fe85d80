//! Provisioning Service
//!
//! Transport-facing handlers for every tenant document kind. Writes run
//! envelope -> flat -> validate -> store -> envelope; reads run the reverse.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ProvisioningConfig;
use crate::datastore::{DocumentStore, StoreError};
use crate::envelope::{expand_to_envelope, flatten_from_envelope, Envelope};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::membership::{build_membership, MembershipReport, MembershipRequest};
use crate::model::{
    from_flat, to_flat, DataType, Document, FlatDocument, IngestionProfile, Metadata,
    MonitoredObject, DATATYPE_KEY,
};
use crate::validation::{validate_id_request, ValidationError, ValidationRule};
use crate::wire::WireShape;

/// Outcome of one item in a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub ok: bool,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl BulkOperationResult {
    fn success(id: String, rev: String) -> Self {
        Self {
            ok: true,
            id,
            rev,
            ..Default::default()
        }
    }

    fn failure(id: String, err: &ProvisioningError) -> Self {
        Self {
            ok: false,
            id,
            error: err.code().to_string(),
            reason: err.to_string(),
            ..Default::default()
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_kind(document: &FlatDocument, datatype: DataType) -> bool {
    document.get(DATATYPE_KEY).and_then(Value::as_str) == Some(datatype.as_str())
}

/// Tenant provisioning service
pub struct ProvisioningService<S> {
    store: Arc<S>,
    config: ProvisioningConfig,
}

impl<S: DocumentStore> ProvisioningService<S> {
    /// Service over `store`, governed by `config`
    pub fn new(store: Arc<S>, config: ProvisioningConfig) -> Self {
        Self { store, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Backing document store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a document. The request must not carry a revision.
    pub async fn create<T: WireShape>(
        &self,
        request: Envelope<T::Data>,
    ) -> ProvisioningResult<Envelope<T::Data>> {
        let document: T = flatten_from_envelope(&request)?;
        let created = self.insert(document).await?;
        Ok(expand_to_envelope(&created)?)
    }

    /// Update a document. The request must carry the current revision.
    pub async fn update<T: WireShape>(
        &self,
        request: Envelope<T::Data>,
    ) -> ProvisioningResult<Envelope<T::Data>> {
        let document: T = flatten_from_envelope(&request)?;
        let updated = self.replace(document).await?;
        Ok(expand_to_envelope(&updated)?)
    }

    /// Fetch one document of kind `T`.
    pub async fn get<T: WireShape>(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> ProvisioningResult<Envelope<T::Data>> {
        let document: T = self.fetch(tenant_id, id).await?;
        debug!("Retrieved {}: {:?}", T::DATATYPE.display_name(), document.redacted());
        Ok(expand_to_envelope(&document)?)
    }

    /// Delete one document of kind `T`, returning what was stored.
    pub async fn delete<T: WireShape>(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> ProvisioningResult<Envelope<T::Data>> {
        self.fetch::<T>(tenant_id, id).await?;
        let deleted: T = from_flat(self.store.delete(tenant_id, id).await?)?;
        info!("Deleted {} {} for tenant {}", T::DATATYPE.display_name(), id, tenant_id);
        Ok(expand_to_envelope(&deleted)?)
    }

    /// Every document of kind `T` for a tenant.
    pub async fn get_all<T: WireShape>(
        &self,
        tenant_id: &str,
    ) -> ProvisioningResult<Vec<Envelope<T::Data>>> {
        let documents = self.list::<T>(tenant_id).await?;
        debug!("Retrieved {} {} records", documents.len(), T::DATATYPE.display_name());
        documents
            .iter()
            .map(|document| expand_to_envelope(document).map_err(ProvisioningError::from))
            .collect()
    }

    /// The tenant's metadata document
    pub async fn get_tenant_metadata(
        &self,
        tenant_id: &str,
    ) -> ProvisioningResult<Envelope<<Metadata as WireShape>::Data>> {
        self.first_of_kind::<Metadata>(tenant_id).await
    }

    /// The ingestion profile in effect for the tenant
    pub async fn get_active_ingestion_profile(
        &self,
        tenant_id: &str,
    ) -> ProvisioningResult<Envelope<<IngestionProfile as WireShape>::Data>> {
        self.first_of_kind::<IngestionProfile>(tenant_id).await
    }

    /// Create many monitored objects. Each item succeeds or fails on its own.
    pub async fn bulk_create_monitored_objects(
        &self,
        tenant_id: &str,
        objects: Vec<MonitoredObject>,
    ) -> ProvisioningResult<Vec<BulkOperationResult>> {
        self.check_bulk(tenant_id, objects.len())?;

        let mut results = Vec::with_capacity(objects.len());
        for mut object in objects {
            object.tenant_id = tenant_id.to_string();
            let requested = object.generate_id();
            let result = match self.insert(object).await {
                Ok(created) => BulkOperationResult::success(created.id, created.rev),
                Err(e) => {
                    warn!("Bulk create of {} failed: {}", requested, e);
                    BulkOperationResult::failure(requested, &e)
                }
            };
            results.push(result);
        }

        info!(
            "Bulk created {}/{} {} for tenant {}",
            results.iter().filter(|r| r.ok).count(),
            results.len(),
            DataType::MonitoredObject.display_name(),
            tenant_id
        );
        Ok(results)
    }

    /// Update many monitored objects. Each item carries its own id and revision.
    pub async fn bulk_update_monitored_objects(
        &self,
        tenant_id: &str,
        objects: Vec<MonitoredObject>,
    ) -> ProvisioningResult<Vec<BulkOperationResult>> {
        self.check_bulk(tenant_id, objects.len())?;

        let mut results = Vec::with_capacity(objects.len());
        for mut object in objects {
            object.tenant_id = tenant_id.to_string();
            let requested = object.id.clone();
            let result = match self.replace(object).await {
                Ok(updated) => BulkOperationResult::success(updated.id, updated.rev),
                Err(e) => {
                    warn!("Bulk update of {} failed: {}", requested, e);
                    BulkOperationResult::failure(requested, &e)
                }
            };
            results.push(result);
        }

        info!(
            "Bulk updated {}/{} {} for tenant {}",
            results.iter().filter(|r| r.ok).count(),
            results.len(),
            DataType::MonitoredObject.display_name(),
            tenant_id
        );
        Ok(results)
    }

    /// Domain membership over the tenant's current monitored objects
    pub async fn monitored_object_domain_map(
        &self,
        request: &MembershipRequest,
    ) -> ProvisioningResult<MembershipReport> {
        let objects = self.list::<MonitoredObject>(&request.tenant_id).await?;
        let report = build_membership(request, &objects)?;
        debug!(
            "Built domain map for tenant {} over {} objects ({} domains)",
            request.tenant_id,
            objects.len(),
            report.domain_to_count_map.len()
        );
        Ok(report)
    }

    async fn insert<T: Document>(&self, mut document: T) -> ProvisioningResult<T> {
        let entity = T::DATATYPE.display_name();
        debug!("Creating {}: {:?}", entity, document.redacted());

        document.validate(false)?;
        self.check_domain_references(&document).await?;

        let now = now_millis();
        let id = document.generate_id();
        document.set_id(id);
        document.set_datatype(T::DATATYPE);
        document.set_created_timestamp(now);
        document.set_last_modified_timestamp(now);

        // Metadata has a fixed id, so the store's create check is the singleton check.
        let rev = match self.store.put(to_flat(&document)?).await {
            Err(StoreError::RevisionConflict { .. }) if T::DATATYPE == DataType::Metadata => {
                return Err(ProvisioningError::AlreadyExists {
                    entity,
                    tenant_id: document.tenant_id().to_string(),
                });
            }
            result => result?,
        };
        document.set_rev(rev);

        info!("Created {} {} for tenant {}", entity, document.id(), document.tenant_id());
        Ok(document)
    }

    async fn replace<T: Document>(&self, mut document: T) -> ProvisioningResult<T> {
        let entity = T::DATATYPE.display_name();
        debug!("Updating {}: {:?}", entity, document.redacted());

        document.validate(true)?;
        self.fetch::<T>(document.tenant_id(), document.id()).await?;
        self.check_domain_references(&document).await?;

        document.set_datatype(T::DATATYPE);
        document.set_last_modified_timestamp(now_millis());

        let rev = self.store.put(to_flat(&document)?).await?;
        document.set_rev(rev);

        info!("Updated {} {} for tenant {}", entity, document.id(), document.tenant_id());
        Ok(document)
    }

    /// A document of another kind under the same id reads as absent.
    async fn fetch<T: Document>(&self, tenant_id: &str, id: &str) -> ProvisioningResult<T> {
        validate_id_request(T::DATATYPE, tenant_id, id)?;
        let flat = self.store.get(tenant_id, id).await?;
        if !is_kind(&flat, T::DATATYPE) {
            return Err(StoreError::not_found(tenant_id, id).into());
        }
        Ok(from_flat(flat)?)
    }

    async fn list<T: Document>(&self, tenant_id: &str) -> ProvisioningResult<Vec<T>> {
        if tenant_id.is_empty() {
            return Err(ValidationError::new(T::DATATYPE, ValidationRule::MissingTenantId).into());
        }
        self.store
            .list_by_tenant(tenant_id, T::DATATYPE)
            .await?
            .into_iter()
            .map(|flat| from_flat(flat).map_err(ProvisioningError::from))
            .collect()
    }

    async fn first_of_kind<T: WireShape>(
        &self,
        tenant_id: &str,
    ) -> ProvisioningResult<Envelope<T::Data>> {
        let document = self
            .list::<T>(tenant_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(tenant_id, T::DATATYPE.as_str()))?;
        Ok(expand_to_envelope(&document)?)
    }

    fn check_bulk(&self, tenant_id: &str, requested: usize) -> ProvisioningResult<()> {
        if tenant_id.is_empty() {
            return Err(ValidationError::new(
                DataType::MonitoredObject,
                ValidationRule::MissingTenantId,
            )
            .into());
        }
        if requested > self.config.max_bulk_size {
            return Err(ProvisioningError::BulkLimitExceeded {
                requested,
                limit: self.config.max_bulk_size,
            });
        }
        Ok(())
    }

    async fn check_domain_references<T: Document>(&self, document: &T) -> ProvisioningResult<()> {
        if !self.config.enforce_domain_references {
            return Ok(());
        }
        for domain_id in document.domain_references() {
            match self.store.get(document.tenant_id(), domain_id).await {
                Ok(found) if is_kind(&found, DataType::Domain) => {}
                Ok(_) | Err(StoreError::NotFound { .. }) => {
                    return Err(ProvisioningError::DanglingReference {
                        entity: T::DATATYPE.display_name(),
                        domain_id: domain_id.clone(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
