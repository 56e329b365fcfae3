// ── Response shapes ──
//
// Typed views over the documents the cluster returns. Every field is
// defaulted: the cluster omits fields freely across releases, and an absent
// field must not fail the whole decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `PATCH /v1/cluster/me`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterProperties {
    pub id: String,
    pub version: String,
    pub api_version: String,
    pub name: String,
    pub timezone: Timezone,
    pub geolocation: Geolocation,
    pub accepted_eula_version: String,
    pub latest_eula_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timezone {
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geolocation {
    pub address: String,
}

/// `POST /internal/syslog`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogServer {
    pub id: String,
    pub hostname: String,
    pub port: u16,
    pub protocol: String,
}

/// `/internal/smtp_instance`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmtpInstance {
    pub id: String,
    pub smtp_hostname: String,
    pub smtp_port: u16,
    pub smtp_security: String,
    pub smtp_username: String,
    pub from_email_id: String,
}

/// One entry of `GET /internal/archive/object_store`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStore {
    pub id: String,
    /// Kept dynamic: the definition is what reconciliation compares.
    pub definition: Map<String, Value>,
}

impl ObjectStore {
    pub fn name(&self) -> Option<&str> {
        self.definition.get("name").and_then(Value::as_str)
    }

    pub fn object_store_type(&self) -> Option<&str> {
        self.definition.get("objectStoreType").and_then(Value::as_str)
    }
}

/// One entry of `GET /internal/archive/location`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveLocation {
    pub id: String,
    pub name: String,
    pub location_type: String,
    pub is_active: bool,
    pub ip_address: String,
    pub bucket: String,
    pub ownership_status: String,
}

/// `GET /internal/aws/account/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsAccount {
    pub id: String,
    pub name: String,
    pub access_key: String,
    pub regions: Vec<String>,
    pub regional_bolt_network_configs: Vec<BoltNetworkConfig>,
    pub disaster_recovery_archival_location_id: String,
    pub configured_sla_domain_id: String,
    pub configured_sla_domain_name: String,
    pub primary_cluster_id: String,
}

/// Per-region network placement of cloud compute instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoltNetworkConfig {
    pub region: String,
    pub v_net_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
}
