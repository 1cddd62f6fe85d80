//! Transport shapes
//!
//! Bodies carried inside an [`Envelope`](crate::envelope::Envelope) on the
//! RPC side. They mirror the storage documents minus `_id`/`_rev`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::WireData;
use crate::model::{
    Document, Domain, FlatDocument, IngestionMetrics, IngestionProfile, Metadata,
    MonitoredObject, ThresholdProfile, User, UserState, VendorThresholds,
};
use std::collections::BTreeMap;

const STATE_KEY: &str = "state";

/// Pairs a storage document kind with its transport body.
pub trait WireShape: Document {
    type Data: WireData + Send + Sync;
}

impl WireShape for User {
    type Data = UserData;
}

impl WireShape for Domain {
    type Data = DomainData;
}

impl WireShape for IngestionProfile {
    type Data = IngestionProfileData;
}

impl WireShape for ThresholdProfile {
    type Data = ThresholdProfileData;
}

impl WireShape for MonitoredObject {
    type Data = MonitoredObjectData;
}

impl WireShape for Metadata {
    type Data = MetadataData;
}

/// Tenant user body. `state` travels as the numeric enum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    pub datatype: String,
    pub tenant_id: String,
    pub username: String,
    pub password: String,
    pub send_onboarding_email: bool,
    pub onboarding_token: String,
    pub user_verified: bool,
    pub state: i32,
    pub domains: Vec<String>,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for UserData {
    fn encode_fields(fields: &mut FlatDocument) {
        if let Some(Value::String(name)) = fields.get(STATE_KEY) {
            let code = UserState::from_name(name).code();
            fields.insert(STATE_KEY.to_string(), Value::from(code));
        }
    }

    fn decode_fields(fields: &mut FlatDocument) {
        if let Some(Value::Number(code)) = fields.get(STATE_KEY) {
            let state = UserState::from_code(code.as_u64().unwrap_or_default());
            fields.insert(STATE_KEY.to_string(), Value::from(state.as_str()));
        }
    }
}

/// Tenant domain body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainData {
    pub datatype: String,
    pub tenant_id: String,
    pub name: String,
    pub color: String,
    pub threshold_profile_set: Vec<String>,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for DomainData {}

/// Ingestion profile body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestionProfileData {
    pub datatype: String,
    pub tenant_id: String,
    pub metrics: IngestionMetrics,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for IngestionProfileData {}

/// Threshold profile body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdProfileData {
    pub datatype: String,
    pub tenant_id: String,
    pub name: String,
    pub thresholds: BTreeMap<String, VendorThresholds>,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for ThresholdProfileData {}

/// Monitored object body. `id` is the monitored object id, not the storage id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitoredObjectData {
    pub datatype: String,
    pub tenant_id: String,
    pub id: String,
    pub actuator_type: String,
    pub actuator_name: String,
    pub reflector_type: String,
    pub reflector_name: String,
    pub object_type: String,
    pub object_name: String,
    pub color: String,
    pub domain_set: Vec<String>,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for MonitoredObjectData {}

/// Tenant metadata body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataData {
    pub datatype: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub default_threshold_profile: String,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
}

impl WireData for MetadataData {}
