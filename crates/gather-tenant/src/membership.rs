//! Domain Membership
//!
//! Derives, per domain, how many monitored objects reference it and which
//! ones. Recomputed from the full object set on every request.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{DataType, MonitoredObject};
use crate::validation::{ValidationError, ValidationResult, ValidationRule};

/// Membership query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembershipRequest {
    pub tenant_id: String,
    /// Advisory only: both maps are always filled.
    pub by_count: bool,
    /// Domains of interest. Empty means every domain.
    pub domain_set: Vec<String>,
}

/// Membership result. Domains nothing references are absent from both maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipReport {
    pub domain_to_count_map: BTreeMap<String, usize>,
    pub domain_to_object_set_map: BTreeMap<String, Vec<String>>,
}

impl MembershipReport {
    fn record(&mut self, domain: &str, object_id: &str) {
        *self.domain_to_count_map.entry(domain.to_string()).or_default() += 1;
        self.domain_to_object_set_map
            .entry(domain.to_string())
            .or_default()
            .push(object_id.to_string());
    }
}

/// Storage id of a stored object; raw input without one falls back to the
/// monitored object id.
fn object_key(object: &MonitoredObject) -> &str {
    if object.id.is_empty() {
        &object.monitored_object_id
    } else {
        &object.id
    }
}

/// Build the membership maps for the request's tenant.
///
/// Objects belonging to another tenant are skipped. A domain listed twice
/// in one object's `domainSet` counts once for that object.
pub fn build_membership(
    request: &MembershipRequest,
    objects: &[MonitoredObject],
) -> ValidationResult<MembershipReport> {
    if request.tenant_id.is_empty() {
        return Err(ValidationError::new(
            DataType::MonitoredObject,
            ValidationRule::MissingTenantId,
        ));
    }

    let wanted: BTreeSet<&str> = request.domain_set.iter().map(String::as_str).collect();
    let mut report = MembershipReport::default();

    for object in objects.iter().filter(|o| o.tenant_id == request.tenant_id) {
        let mut seen = BTreeSet::new();
        for domain in &object.domain_set {
            if !seen.insert(domain.as_str()) {
                continue;
            }
            if wanted.is_empty() || wanted.contains(domain.as_str()) {
                report.record(domain, object_key(object));
            }
        }
    }

    Ok(report)
}
