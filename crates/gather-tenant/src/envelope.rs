//! Envelope Conversion
//!
//! Storage keeps documents flat:
//!
//! ```text
//! { "_id": .., "_rev": .., "datatype": .., "tenantId": .., ...fields }
//! ```
//!
//! Transport nests everything except the identifier and revision:
//!
//! ```text
//! { "_id": .., "_rev": .., "data": { "datatype": .., "tenantId": .., ...fields } }
//! ```
//!
//! Conversion goes through a generic JSON object, so it needs no knowledge of
//! the document kind. Fields the target shape does not declare are dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{from_flat, to_flat, FlatDocument, ID_KEY, REV_KEY};

/// Key holding the nested document body
pub const DATA_KEY: &str = "data";

/// Conversion result type
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Conversion errors
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("unable to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unable to decode document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("{0} is not a JSON object")]
    NotAnObject(&'static str),

    #[error("envelope has no 'data' key")]
    MissingData,

    #[error("envelope 'data' is not a JSON object")]
    DataNotAnObject,

    #[error("unknown datatype '{0}'")]
    UnknownDatatype(String),
}

/// Transport envelope around a document body of shape `D`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D> {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    pub data: D,
}

impl<D> Envelope<D> {
    /// Envelope for a document that has not been stored yet
    pub fn new(data: D) -> Self {
        Self {
            id: String::new(),
            rev: String::new(),
            data,
        }
    }
}

/// A transport body shape.
///
/// Most shapes carry fields through untouched. A shape whose transport
/// encoding differs from storage rewrites the affected fields here.
pub trait WireData: Serialize + DeserializeOwned {
    /// Storage fields -> transport fields
    fn encode_fields(_fields: &mut FlatDocument) {}

    /// Transport fields -> storage fields
    fn decode_fields(_fields: &mut FlatDocument) {}
}

/// Nest a flat document: `_id` and `_rev` stay on top, the rest moves under `data`.
pub fn expand(mut flat: FlatDocument) -> FlatDocument {
    let mut envelope = FlatDocument::new();
    for key in [ID_KEY, REV_KEY] {
        if let Some(value) = flat.remove(key) {
            envelope.insert(key.to_string(), value);
        }
    }
    envelope.insert(DATA_KEY.to_string(), Value::Object(flat));
    envelope
}

/// Inverse of [`expand`].
pub fn flatten(mut envelope: FlatDocument) -> ConversionResult<FlatDocument> {
    let mut flat = match envelope.remove(DATA_KEY) {
        Some(Value::Object(data)) => data,
        Some(_) => return Err(ConversionError::DataNotAnObject),
        None => return Err(ConversionError::MissingData),
    };
    for key in [ID_KEY, REV_KEY] {
        if let Some(value) = envelope.remove(key) {
            flat.insert(key.to_string(), value);
        }
    }
    Ok(flat)
}

/// Convert a flat storage document into a transport envelope.
pub fn expand_to_envelope<S, D>(flat: &S) -> ConversionResult<Envelope<D>>
where
    S: Serialize,
    D: WireData,
{
    let mut envelope = expand(to_flat(flat)?);
    if let Some(Value::Object(data)) = envelope.get_mut(DATA_KEY) {
        D::encode_fields(data);
    }
    serde_json::from_value(Value::Object(envelope)).map_err(ConversionError::Decode)
}

/// Convert a transport envelope into a flat storage document.
pub fn flatten_from_envelope<D, S>(envelope: &Envelope<D>) -> ConversionResult<S>
where
    D: WireData,
    S: DeserializeOwned,
{
    let mut generic = to_flat(envelope)?;
    match generic.get_mut(DATA_KEY) {
        Some(Value::Object(data)) => D::decode_fields(data),
        Some(_) => return Err(ConversionError::DataNotAnObject),
        None => return Err(ConversionError::MissingData),
    }
    from_flat(flatten(generic)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MonitoredObject, User, UserState};
    use crate::wire::{MonitoredObjectData, UserData};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn object(value: Value) -> FlatDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_expand_lifts_structural_keys() {
        let flat = object(json!({
            "_id": "d-1",
            "_rev": "2-ff",
            "datatype": "domain",
            "tenantId": "t1",
            "name": "Core"
        }));

        let envelope = expand(flat.clone());
        assert_eq!(envelope["_id"], json!("d-1"));
        assert_eq!(envelope["_rev"], json!("2-ff"));
        assert_eq!(
            envelope["data"],
            json!({ "datatype": "domain", "tenantId": "t1", "name": "Core" })
        );
        assert_eq!(flatten(envelope).unwrap(), flat);
    }

    #[test]
    fn test_unrevised_document_has_no_revision_key() {
        let envelope = expand(object(json!({ "tenantId": "t1" })));
        assert!(!envelope.contains_key("_rev"));
        assert!(!envelope.contains_key("_id"));
        assert!(!flatten(envelope).unwrap().contains_key("_rev"));
    }

    #[test]
    fn test_flatten_rejects_malformed_envelopes() {
        let missing = flatten(object(json!({ "_id": "x" }))).unwrap_err();
        assert!(matches!(missing, ConversionError::MissingData));

        let scalar = flatten(object(json!({ "_id": "x", "data": 7 }))).unwrap_err();
        assert!(matches!(scalar, ConversionError::DataNotAnObject));
    }

    #[test]
    fn test_monitored_object_conversion() {
        let stored = MonitoredObject {
            id: "theID".into(),
            rev: "1-abc".into(),
            datatype: "monitoredObject".into(),
            tenant_id: "t1".into(),
            monitored_object_id: "BestID".into(),
            actuator_name: "Act1".into(),
            actuator_type: "Good".into(),
            object_name: "Casper".into(),
            domain_set: vec!["d1".into(), "d2".into()],
            created_timestamp: 1234,
            last_modified_timestamp: 5678,
            ..Default::default()
        };

        let wire: Envelope<MonitoredObjectData> = expand_to_envelope(&stored).unwrap();
        assert_eq!(wire.id, stored.id);
        assert_eq!(wire.rev, stored.rev);
        assert_eq!(wire.data.id, stored.monitored_object_id);
        assert_eq!(wire.data.actuator_name, stored.actuator_name);
        assert_eq!(wire.data.datatype, stored.datatype);
        assert_eq!(wire.data.created_timestamp, stored.created_timestamp);

        let back: MonitoredObject = flatten_from_envelope(&wire).unwrap();
        assert_eq!(back, stored);
    }

    #[test]
    fn test_user_state_crosses_as_number() {
        let user = User {
            id: "u1".into(),
            tenant_id: "t1".into(),
            username: "ops".into(),
            state: UserState::Suspended,
            ..Default::default()
        };

        let wire: Envelope<UserData> = expand_to_envelope(&user).unwrap();
        assert_eq!(wire.data.state, 3);
        assert_eq!(serde_json::to_value(&wire).unwrap()["data"]["state"], json!(3));

        let back: User = flatten_from_envelope(&wire).unwrap();
        assert_eq!(back.state, UserState::Suspended);
        assert_eq!(back, user);
    }

    #[test]
    fn test_narrower_target_drops_fields() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Summary {
            #[serde(default)]
            tenant_id: String,
            #[serde(default)]
            object_name: String,
        }
        impl WireData for Summary {}

        let mo = MonitoredObject {
            id: "mo-1".into(),
            tenant_id: "t1".into(),
            monitored_object_id: "mo-1".into(),
            object_name: "edge-7".into(),
            color: "#fff".into(),
            ..Default::default()
        };
        let summary: Envelope<Summary> = expand_to_envelope(&mo).unwrap();
        assert_eq!(summary.id, "mo-1");
        assert_eq!(summary.data.object_name, "edge-7");

        // Widening back fills the missing fields with defaults.
        let widened: MonitoredObject = flatten_from_envelope(&summary).unwrap();
        assert_eq!(widened.object_name, "edge-7");
        assert_eq!(widened.color, "");
        assert!(widened.monitored_object_id.is_empty());
    }

    #[test]
    fn test_mistyped_field_fails_to_decode() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Mistyped {
            #[serde(rename = "tenantId")]
            tenant_id: String,
            #[serde(rename = "domainSet")]
            domain_set: i64,
        }
        impl WireData for Mistyped {}

        let wire = Envelope::new(Mistyped {
            tenant_id: "t1".into(),
            domain_set: 7,
        });
        let err = flatten_from_envelope::<_, MonitoredObject>(&wire).unwrap_err();
        assert!(matches!(err, ConversionError::Decode(_)));

        let stored = json!({ "_id": "mo-1", "tenantId": "t1", "domainSet": 7 });
        let err = expand_to_envelope::<_, MonitoredObjectData>(&stored).unwrap_err();
        assert!(matches!(err, ConversionError::Decode(_)));
    }

    #[test]
    fn test_non_object_source_is_rejected() {
        let err = expand_to_envelope::<_, MonitoredObjectData>(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, ConversionError::NotAnObject(_)));
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 _-]{0,12}".prop_map(Value::from),
            prop::collection::vec("[a-z]{1,6}", 0..4).prop_map(Value::from),
        ]
    }

    fn flat_document() -> impl Strategy<Value = FlatDocument> {
        (
            prop::collection::btree_map(
                "[a-z][a-zA-Z]{0,8}".prop_filter("structural key", |k| k != DATA_KEY),
                leaf(),
                0..10,
            ),
            proptest::option::of("[a-z0-9-]{1,16}"),
            proptest::option::of("[0-9]{1,3}-[a-f0-9]{8}"),
        )
            .prop_map(|(fields, id, rev): (BTreeMap<String, Value>, _, _)| {
                let mut doc: FlatDocument = fields.into_iter().collect();
                if let Some(id) = id {
                    doc.insert(ID_KEY.to_string(), Value::from(id));
                }
                if let Some(rev) = rev {
                    doc.insert(REV_KEY.to_string(), Value::from(rev));
                }
                doc
            })
    }

    proptest! {
        #[test]
        fn test_flatten_inverts_expand(doc in flat_document()) {
            prop_assert_eq!(flatten(expand(doc.clone())).unwrap(), doc);
        }

        #[test]
        fn test_expand_is_stateless(doc in flat_document()) {
            let first = expand(doc.clone());
            let second = expand(doc.clone());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(flatten(second).unwrap(), doc);
        }
    }
}
