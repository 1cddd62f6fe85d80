//! Tenant Data Model
//!
//! Every provisioned resource is a flat document carrying the same header
//! (`_id`, `_rev`, `datatype`, `tenantId`, timestamps) next to its own fields.
//! Several kinds share one storage collection, told apart by the `datatype` tag.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::envelope::{ConversionError, ConversionResult};
use crate::validation::{Validate, ValidationResult};

/// Storage identifier key
pub const ID_KEY: &str = "_id";
/// Revision token key
pub const REV_KEY: &str = "_rev";
/// Datatype tag key
pub const DATATYPE_KEY: &str = "datatype";
/// Owning tenant key
pub const TENANT_ID_KEY: &str = "tenantId";

/// A document in its flat storage form.
pub type FlatDocument = serde_json::Map<String, Value>;

/// Tenant ID
pub type TenantId = String;

/// Kinds of document stored for a tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "ingestionProfile")]
    IngestionProfile,
    #[serde(rename = "thresholdProfile")]
    ThresholdProfile,
    #[serde(rename = "monitoredObject")]
    MonitoredObject,
    #[serde(rename = "tenantMetadata")]
    Metadata,
}

impl DataType {
    /// Tag written into the `datatype` field
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Domain => "domain",
            Self::IngestionProfile => "ingestionProfile",
            Self::ThresholdProfile => "thresholdProfile",
            Self::MonitoredObject => "monitoredObject",
            Self::Metadata => "tenantMetadata",
        }
    }

    /// Human readable name used in messages and logs
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::User => "Tenant User",
            Self::Domain => "Tenant Domain",
            Self::IngestionProfile => "Tenant Ingestion Profile",
            Self::ThresholdProfile => "Tenant Threshold Profile",
            Self::MonitoredObject => "Tenant Monitored Object",
            Self::Metadata => "Tenant Meta",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "domain" => Ok(Self::Domain),
            "ingestionProfile" => Ok(Self::IngestionProfile),
            "thresholdProfile" => Ok(Self::ThresholdProfile),
            "monitoredObject" => Ok(Self::MonitoredObject),
            "tenantMetadata" => Ok(Self::Metadata),
            other => Err(ConversionError::UnknownDatatype(other.to_string())),
        }
    }
}

/// Behaviour shared by every tenant document kind.
///
/// The storage and envelope machinery only ever touch a document through
/// this trait, so it is the one place the header fields are named.
pub trait Document:
    Validate + Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Datatype tag for this kind
    const DATATYPE: DataType;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn rev(&self) -> &str;
    fn set_rev(&mut self, rev: String);
    fn datatype(&self) -> &str;
    fn set_datatype(&mut self, datatype: DataType);
    fn tenant_id(&self) -> &str;
    fn created_timestamp(&self) -> i64;
    fn set_created_timestamp(&mut self, millis: i64);
    fn last_modified_timestamp(&self) -> i64;
    fn set_last_modified_timestamp(&mut self, millis: i64);

    /// Storage identifier for a document being created.
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Domain identifiers this document points at.
    fn domain_references(&self) -> &[String] {
        &[]
    }

    /// Copy of the document that is safe to write into a log line.
    fn redacted(&self) -> Self {
        self.clone()
    }
}

macro_rules! impl_document_header {
    ($ty:ident, $datatype:expr) => {
        impl Document for $ty {
            const DATATYPE: DataType = $datatype;

            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
            fn rev(&self) -> &str {
                &self.rev
            }
            fn set_rev(&mut self, rev: String) {
                self.rev = rev;
            }
            fn datatype(&self) -> &str {
                &self.datatype
            }
            fn set_datatype(&mut self, datatype: DataType) {
                self.datatype = datatype.as_str().to_string();
            }
            fn tenant_id(&self) -> &str {
                &self.tenant_id
            }
            fn created_timestamp(&self) -> i64 {
                self.created_timestamp
            }
            fn set_created_timestamp(&mut self, millis: i64) {
                self.created_timestamp = millis;
            }
            fn last_modified_timestamp(&self) -> i64 {
                self.last_modified_timestamp
            }
            fn set_last_modified_timestamp(&mut self, millis: i64) {
                self.last_modified_timestamp = millis;
            }
            document_extras!($ty);
        }
    };
}

macro_rules! document_extras {
    (User) => {
        fn domain_references(&self) -> &[String] {
            &self.domains
        }
        fn redacted(&self) -> Self {
            let mut copy = self.clone();
            copy.password = REDACTED.to_string();
            copy
        }
    };
    (MonitoredObject) => {
        fn generate_id(&self) -> String {
            self.monitored_object_id.trim().to_string()
        }
        fn domain_references(&self) -> &[String] {
            &self.domain_set
        }
    };
    (Metadata) => {
        /// One per tenant, so the id is fixed and a second create collides.
        fn generate_id(&self) -> String {
            DataType::Metadata.as_str().to_string()
        }
    };
    ($other:ident) => {};
}

/// Replacement text for secrets in log output
pub const REDACTED: &str = "XXXXXXXX";

/// Lifecycle state of a tenant user
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserState {
    #[default]
    #[serde(rename = "USER_UNKNOWN")]
    Unknown,
    Invited,
    Active,
    Suspended,
    PendingDelete,
}

impl UserState {
    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "USER_UNKNOWN",
            Self::Invited => "INVITED",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::PendingDelete => "PENDING_DELETE",
        }
    }

    /// Numeric form used by the transport enum
    pub const fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Invited => 1,
            Self::Active => 2,
            Self::Suspended => 3,
            Self::PendingDelete => 4,
        }
    }

    /// Unknown codes decode to `Unknown`.
    pub const fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Invited,
            2 => Self::Active,
            3 => Self::Suspended,
            4 => Self::PendingDelete,
            _ => Self::Unknown,
        }
    }

    /// Unknown names decode to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "INVITED" => Self::Invited,
            "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            "PENDING_DELETE" => Self::PendingDelete,
            _ => Self::Unknown,
        }
    }
}

/// Tenant user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub username: String,
    /// Never logged; see [`Document::redacted`]
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub send_onboarding_email: bool,
    #[serde(default)]
    pub onboarding_token: String,
    #[serde(default)]
    pub user_verified: bool,
    #[serde(default)]
    pub state: UserState,
    /// Domains this user may see
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

/// Tenant domain: a grouping of monitored objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Threshold profiles applied to this domain
    #[serde(default)]
    pub threshold_profile_set: Vec<String>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

/// vendor -> monitored object type -> metric -> enabled
pub type IngestionMetrics = BTreeMap<String, BTreeMap<String, BTreeMap<String, bool>>>;

/// Tenant ingestion profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub metrics: IngestionMetrics,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

impl IngestionProfile {
    /// Whether a metric leaf is switched on. Missing leaves are off.
    pub fn is_enabled(&self, vendor: &str, object_type: &str, metric: &str) -> bool {
        self.metrics
            .get(vendor)
            .and_then(|types| types.get(object_type))
            .and_then(|metrics| metrics.get(metric))
            .copied()
            .unwrap_or(false)
    }
}

/// monitored object type -> metric -> direction -> attribute -> value
pub type ObjectTypeThresholds =
    BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>>;

/// Thresholds for one vendor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorThresholds {
    #[serde(default)]
    pub monitored_object_type_map: ObjectTypeThresholds,
    /// Vendor scoped metric settings
    #[serde(default)]
    pub metric_map: BTreeMap<String, String>,
}

/// Tenant threshold profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub name: String,
    /// Keyed by vendor
    #[serde(default)]
    pub thresholds: BTreeMap<String, VendorThresholds>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

impl ThresholdProfile {
    /// Look up a single threshold attribute.
    pub fn threshold(
        &self,
        vendor: &str,
        object_type: &str,
        metric: &str,
        direction: &str,
        attribute: &str,
    ) -> Option<&str> {
        self.thresholds
            .get(vendor)?
            .monitored_object_type_map
            .get(object_type)?
            .get(metric)?
            .get(direction)?
            .get(attribute)
            .map(String::as_str)
    }
}

/// Device or endpoint whose telemetry is ingested.
///
/// `monitored_object_id` is the id assigned by the ingestion side; the
/// storage `id` is derived from it on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredObject {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(rename = "id", default)]
    pub monitored_object_id: String,
    #[serde(default)]
    pub actuator_type: String,
    #[serde(default)]
    pub actuator_name: String,
    #[serde(default)]
    pub reflector_type: String,
    #[serde(default)]
    pub reflector_name: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub object_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub domain_set: Vec<String>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

/// Per-tenant metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub tenant_name: String,
    #[serde(default)]
    pub default_threshold_profile: String,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub last_modified_timestamp: i64,
}

impl_document_header!(User, DataType::User);
impl_document_header!(Domain, DataType::Domain);
impl_document_header!(IngestionProfile, DataType::IngestionProfile);
impl_document_header!(ThresholdProfile, DataType::ThresholdProfile);
impl_document_header!(MonitoredObject, DataType::MonitoredObject);
impl_document_header!(Metadata, DataType::Metadata);

/// Any tenant document, decoded by its `datatype` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TenantDocument {
    User(User),
    Domain(Domain),
    IngestionProfile(IngestionProfile),
    ThresholdProfile(ThresholdProfile),
    MonitoredObject(MonitoredObject),
    Metadata(Metadata),
}

impl TenantDocument {
    /// Decode a flat document, dispatching on its `datatype` field.
    pub fn from_flat(document: FlatDocument) -> ConversionResult<Self> {
        let datatype: DataType = match document.get(DATATYPE_KEY) {
            Some(Value::String(tag)) => tag.parse()?,
            Some(other) => return Err(ConversionError::UnknownDatatype(other.to_string())),
            None => return Err(ConversionError::UnknownDatatype(String::new())),
        };

        let value = Value::Object(document);
        let decoded = match datatype {
            DataType::User => Self::User(decode(value)?),
            DataType::Domain => Self::Domain(decode(value)?),
            DataType::IngestionProfile => Self::IngestionProfile(decode(value)?),
            DataType::ThresholdProfile => Self::ThresholdProfile(decode(value)?),
            DataType::MonitoredObject => Self::MonitoredObject(decode(value)?),
            DataType::Metadata => Self::Metadata(decode(value)?),
        };
        Ok(decoded)
    }

    /// Encode back into the flat storage form.
    pub fn to_flat(&self) -> ConversionResult<FlatDocument> {
        match self {
            Self::User(doc) => to_flat(doc),
            Self::Domain(doc) => to_flat(doc),
            Self::IngestionProfile(doc) => to_flat(doc),
            Self::ThresholdProfile(doc) => to_flat(doc),
            Self::MonitoredObject(doc) => to_flat(doc),
            Self::Metadata(doc) => to_flat(doc),
        }
    }

    /// Kind of the wrapped document
    pub fn datatype(&self) -> DataType {
        match self {
            Self::User(_) => DataType::User,
            Self::Domain(_) => DataType::Domain,
            Self::IngestionProfile(_) => DataType::IngestionProfile,
            Self::ThresholdProfile(_) => DataType::ThresholdProfile,
            Self::MonitoredObject(_) => DataType::MonitoredObject,
            Self::Metadata(_) => DataType::Metadata,
        }
    }

    /// Run the kind's validation rules.
    pub fn validate(&self, is_update: bool) -> ValidationResult<()> {
        match self {
            Self::User(doc) => doc.validate(is_update),
            Self::Domain(doc) => doc.validate(is_update),
            Self::IngestionProfile(doc) => doc.validate(is_update),
            Self::ThresholdProfile(doc) => doc.validate(is_update),
            Self::MonitoredObject(doc) => doc.validate(is_update),
            Self::Metadata(doc) => doc.validate(is_update),
        }
    }
}

/// Serialize a document into its flat storage form.
pub fn to_flat<T: Serialize>(document: &T) -> ConversionResult<FlatDocument> {
    match serde_json::to_value(document).map_err(ConversionError::Encode)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConversionError::NotAnObject("flat document")),
    }
}

/// Deserialize a flat storage document into a typed one.
pub fn from_flat<T: DeserializeOwned>(document: FlatDocument) -> ConversionResult<T> {
    decode(Value::Object(document))
}

fn decode<T: DeserializeOwned>(value: Value) -> ConversionResult<T> {
    serde_json::from_value(value).map_err(ConversionError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_monitored_object_field_names() {
        let mo = MonitoredObject {
            id: "mo-1".into(),
            tenant_id: "t1".into(),
            monitored_object_id: "mo-1".into(),
            actuator_name: "act".into(),
            domain_set: vec!["d1".into()],
            ..Default::default()
        };

        let flat = to_flat(&mo).unwrap();
        assert_eq!(flat["_id"], json!("mo-1"));
        assert_eq!(flat["id"], json!("mo-1"));
        assert_eq!(flat["tenantId"], json!("t1"));
        assert_eq!(flat["actuatorName"], json!("act"));
        assert_eq!(flat["domainSet"], json!(["d1"]));
        assert!(!flat.contains_key("_rev"));
    }

    #[test]
    fn test_user_state_strings() {
        let user = User {
            state: UserState::PendingDelete,
            ..Default::default()
        };
        let flat = to_flat(&user).unwrap();
        assert_eq!(flat["state"], json!("PENDING_DELETE"));

        let unknown: User = from_flat(to_flat(&User::default()).unwrap()).unwrap();
        assert_eq!(unknown.state, UserState::Unknown);
        assert_eq!(to_flat(&unknown).unwrap()["state"], json!("USER_UNKNOWN"));
    }

    #[test]
    fn test_user_state_codes() {
        for state in [
            UserState::Unknown,
            UserState::Invited,
            UserState::Active,
            UserState::Suspended,
            UserState::PendingDelete,
        ] {
            assert_eq!(UserState::from_code(state.code() as u64), state);
            assert_eq!(UserState::from_name(state.as_str()), state);
        }
        assert_eq!(UserState::from_code(42), UserState::Unknown);
    }

    #[test]
    fn test_datatype_tags() {
        assert_eq!("tenantMetadata".parse::<DataType>().unwrap(), DataType::Metadata);
        assert_eq!(DataType::IngestionProfile.to_string(), "ingestionProfile");
        assert!("tenant".parse::<DataType>().is_err());
    }

    #[test]
    fn test_tenant_document_dispatch() {
        let flat = json!({
            "_id": "d-1",
            "_rev": "1-abc",
            "datatype": "domain",
            "tenantId": "t1",
            "name": "Core",
            "color": "#00ff00",
            "thresholdProfileSet": ["tp-1"],
            "createdTimestamp": 1000,
            "lastModifiedTimestamp": 2000
        });
        let doc = TenantDocument::from_flat(flat.as_object().unwrap().clone()).unwrap();
        assert_eq!(doc.datatype(), DataType::Domain);
        match &doc {
            TenantDocument::Domain(domain) => {
                assert_eq!(domain.name, "Core");
                assert_eq!(domain.threshold_profile_set, vec!["tp-1".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(doc.to_flat().unwrap(), *flat.as_object().unwrap());
    }

    #[test]
    fn test_tenant_document_requires_tag() {
        let untagged = json!({ "_id": "x", "tenantId": "t1" });
        let err = TenantDocument::from_flat(untagged.as_object().unwrap().clone()).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownDatatype(_)));
    }

    #[test]
    fn test_monitored_object_id_generation() {
        let mo = MonitoredObject {
            monitored_object_id: "  sensor-7 ".into(),
            ..Default::default()
        };
        assert_eq!(mo.generate_id(), "sensor-7");
        assert_ne!(Domain::default().generate_id(), Domain::default().generate_id());
        assert_eq!(Metadata::default().generate_id(), "tenantMetadata");
    }

    #[test]
    fn test_user_redaction() {
        let user = User {
            username: "ops".into(),
            password: "hunter2".into(),
            ..Default::default()
        };
        let redacted = user.redacted();
        assert_eq!(redacted.password, REDACTED);
        assert_eq!(redacted.username, "ops");
        assert_eq!(user.password, "hunter2");
    }

    #[test]
    fn test_profile_lookups() {
        let mut profile = IngestionProfile::default();
        profile
            .metrics
            .entry("accedian".into())
            .or_default()
            .entry("twamp-sf".into())
            .or_default()
            .insert("delayP95".into(), true);
        assert!(profile.is_enabled("accedian", "twamp-sf", "delayP95"));
        assert!(!profile.is_enabled("accedian", "twamp-sf", "jitterP95"));

        let thresholds: ThresholdProfile = serde_json::from_value(json!({
            "tenantId": "t1",
            "name": "default",
            "thresholds": {
                "accedian": {
                    "monitoredObjectTypeMap": {
                        "twamp-sf": { "delayP95": { "0": { "critical": "50000" } } }
                    },
                    "metricMap": { "delayP95": "true" }
                }
            }
        }))
        .unwrap();
        assert_eq!(
            thresholds.threshold("accedian", "twamp-sf", "delayP95", "0", "critical"),
            Some("50000")
        );
        assert_eq!(thresholds.threshold("accedian", "twamp-pe", "delayP95", "0", "critical"), None);
    }
}
