//! Request Validation
//!
//! Rules are checked in a fixed order and the first violation is returned:
//! tenant id, then kind-specific required fields, then revision legality.

use std::fmt;

use crate::model::{
    DataType, Document, Domain, IngestionProfile, Metadata, MonitoredObject, ThresholdProfile,
    User,
};

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationError>;

/// The rule a request broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// No owning tenant
    MissingTenantId,
    /// An id request named no document
    MissingIdentifier,
    /// A kind-specific required field is empty
    MissingField {
        /// Wire name of the field
        field: &'static str,
        /// Name used in messages
        label: &'static str,
    },
    /// A create request carried a revision
    RevisionOnCreate,
    /// An update request lacked a revision or created timestamp
    MissingRevision,
}

impl ValidationRule {
    /// Wire name of the offending field
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingTenantId => "tenantId",
            Self::MissingIdentifier => "_id",
            Self::MissingField { field, .. } => field,
            Self::RevisionOnCreate | Self::MissingRevision => "_rev",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTenantId => write!(f, "no Tenant ID provided"),
            Self::MissingIdentifier => write!(f, "no identifier provided"),
            Self::MissingField { label, .. } => write!(f, "no {} provided", label),
            Self::RevisionOnCreate => {
                write!(f, "must not provide a revision value in a creation request")
            }
            Self::MissingRevision => {
                write!(f, "must provide a createdTimestamp and revision for an update")
            }
        }
    }
}

/// A request that violates a document invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {entity} request: {rule}")]
pub struct ValidationError {
    /// Display name of the document kind
    pub entity: &'static str,
    /// The violated rule
    pub rule: ValidationRule,
}

impl ValidationError {
    /// Violation of `rule` by a document of kind `datatype`
    pub fn new(datatype: DataType, rule: ValidationRule) -> Self {
        Self {
            entity: datatype.display_name(),
            rule,
        }
    }
}

/// Gate applied to create (`is_update == false`) and update requests.
pub trait Validate {
    /// First violated rule, if any
    fn validate(&self, is_update: bool) -> ValidationResult<()>;
}

/// Validate a get/delete style request naming one document.
pub fn validate_id_request(datatype: DataType, tenant_id: &str, id: &str) -> ValidationResult<()> {
    if tenant_id.is_empty() {
        return Err(ValidationError::new(datatype, ValidationRule::MissingTenantId));
    }
    if id.is_empty() {
        return Err(ValidationError::new(datatype, ValidationRule::MissingIdentifier));
    }
    Ok(())
}

fn require_tenant<T: Document>(doc: &T) -> ValidationResult<()> {
    if doc.tenant_id().is_empty() {
        return Err(ValidationError::new(T::DATATYPE, ValidationRule::MissingTenantId));
    }
    Ok(())
}

fn check_revision<T: Document>(doc: &T, is_update: bool) -> ValidationResult<()> {
    if !is_update && !doc.rev().is_empty() {
        return Err(ValidationError::new(T::DATATYPE, ValidationRule::RevisionOnCreate));
    }
    if is_update && (doc.rev().is_empty() || doc.created_timestamp() == 0) {
        return Err(ValidationError::new(T::DATATYPE, ValidationRule::MissingRevision));
    }
    Ok(())
}

fn validate_header<T: Document>(doc: &T, is_update: bool) -> ValidationResult<()> {
    require_tenant(doc)?;
    check_revision(doc, is_update)
}

impl Validate for User {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        validate_header(self, is_update)
    }
}

impl Validate for Domain {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        validate_header(self, is_update)
    }
}

impl Validate for IngestionProfile {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        validate_header(self, is_update)
    }
}

impl Validate for ThresholdProfile {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        validate_header(self, is_update)
    }
}

impl Validate for MonitoredObject {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        require_tenant(self)?;
        if self.monitored_object_id.trim().is_empty() {
            return Err(ValidationError::new(
                DataType::MonitoredObject,
                ValidationRule::MissingField {
                    field: "id",
                    label: "Monitored Object ID",
                },
            ));
        }
        check_revision(self, is_update)
    }
}

impl Validate for Metadata {
    fn validate(&self, is_update: bool) -> ValidationResult<()> {
        validate_header(self, is_update)
    }
}
