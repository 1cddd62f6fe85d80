//! Tenant Provisioning Core
//!
//! Provisioning documents for a multi-tenant monitoring backend: users,
//! domains, ingestion and threshold profiles, monitored objects and
//! tenant metadata.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       TENANT PROVISIONING CORE                          │
//! │                                                                         │
//! │   transport  { _id, _rev, data: { datatype, tenantId, ... } }           │
//! │       │                                            ▲                    │
//! │  ┌────▼────────────────────────────────────────────┴─────────────────┐  │
//! │  │                      ENVELOPE CONVERTER                           │  │
//! │  │          flatten_from_envelope        expand_to_envelope          │  │
//! │  └────┬────────────────────────────────────────────▲─────────────────┘  │
//! │       │                                            │                    │
//! │  ┌────▼──────────┐   ┌──────────────────┐   ┌──────┴──────────────┐     │
//! │  │  VALIDATION   │──▶│ PROVISIONING SVC │──▶│  DOMAIN MEMBERSHIP  │     │
//! │  │  fail-fast    │   │ ids, timestamps  │   │  count / object set │     │
//! │  └───────────────┘   └────────┬─────────┘   └─────────────────────┘     │
//! │                               │                                         │
//! │  ┌────────────────────────────▼──────────────────────────────────────┐  │
//! │  │                        DOCUMENT STORE                             │  │
//! │  │   { _id, _rev, datatype, tenantId, ... }   optimistic revisions   │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![allow(dead_code)]
#![warn(missing_docs)]

pub mod config;
pub mod datastore;
pub mod envelope;
pub mod error;
pub mod membership;
pub mod model;
pub mod service;
pub mod validation;
pub mod wire;

pub use config::ProvisioningConfig;
pub use datastore::{DocumentStore, InMemoryDocumentStore, StoreError};
pub use envelope::{expand_to_envelope, flatten_from_envelope, ConversionError, Envelope};
pub use error::{ProvisioningError, ProvisioningResult};
pub use membership::{build_membership, MembershipReport, MembershipRequest};
pub use model::{
    DataType, Document, Domain, FlatDocument, IngestionProfile, Metadata, MonitoredObject,
    TenantDocument, TenantId, ThresholdProfile, User, UserState,
};
pub use service::{BulkOperationResult, ProvisioningService};
pub use validation::{Validate, ValidationError, ValidationRule};
pub use wire::WireShape;
