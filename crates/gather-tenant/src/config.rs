//! Provisioning configuration

use serde::{Deserialize, Serialize};

/// Provisioning service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Refuse writes that reference domains the tenant does not have
    pub enforce_domain_references: bool,

    /// Largest batch accepted by the bulk operations
    pub max_bulk_size: usize,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            enforce_domain_references: false,
            max_bulk_size: 1000,
        }
    }
}
