//! Error types for tenant provisioning

use thiserror::Error;

use crate::datastore::StoreError;
use crate::envelope::ConversionError;
use crate::validation::ValidationError;

/// Provisioning error type
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// Request broke a document invariant
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Payload could not be transcoded
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Passed through from the document store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Singleton document already present
    #[error("Can't create {entity}, it already exists for tenant {tenant_id}")]
    AlreadyExists {
        entity: &'static str,
        tenant_id: String,
    },

    /// Document points at a domain the tenant does not have
    #[error("{entity} references unknown domain '{domain_id}'")]
    DanglingReference {
        entity: &'static str,
        domain_id: String,
    },

    /// Bulk request too large
    #[error("bulk request of {requested} items exceeds the limit of {limit}")]
    BulkLimitExceeded { requested: usize, limit: usize },
}

impl ProvisioningError {
    /// Short machine-readable code, as reported in bulk results
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_)
            | Self::Conversion(_)
            | Self::DanglingReference { .. }
            | Self::BulkLimitExceeded { .. } => "bad_request",
            Self::AlreadyExists { .. } | Self::Store(StoreError::RevisionConflict { .. }) => {
                "conflict"
            }
            Self::Store(StoreError::NotFound { .. }) => "not_found",
            Self::Store(_) => "storage_error",
        }
    }

    /// Whether the caller can fix the request and resend it
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(StoreError::Backend(_)))
    }

    /// Whether the request lost an optimistic concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::RevisionConflict { .. }))
    }

    /// Whether the addressed document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound { .. }))
    }
}

/// Result type for tenant provisioning
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
