// ── Typed request structs for mutating operations ──
//
// Secrets are `SecretString` and are only exposed while the request body is
// built, so these types are deliberately not `Serialize`.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::model::BoltNetworkConfig;
use crate::validation::{AzureInstanceType, SmtpEncryption};

// ── Cluster ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SmtpSettings {
    pub hostname: String,
    pub from_email: String,
    pub username: String,
    pub password: SecretString,
    pub encryption: SmtpEncryption,
    pub port: u16,
}

impl SmtpSettings {
    /// Fields the cluster echoes back; the password never is.
    pub(crate) fn comparable(&self) -> Value {
        json!({
            "smtpSecurity": self.encryption.to_string(),
            "smtpHostname": self.hostname,
            "smtpPort": self.port,
            "smtpUsername": self.username,
            "fromEmailId": self.from_email,
        })
    }
}

#[derive(Debug)]
pub struct VcenterRequest {
    pub hostname: String,
    pub username: String,
    pub password: SecretString,
    /// Let the cluster resolve VM ownership conflicts automatically.
    pub vm_linking: bool,
    /// PEM bundle used to verify the vCenter certificate.
    pub ca_certificate: Option<String>,
}

impl VcenterRequest {
    pub(crate) fn body(&self) -> Value {
        let conflict_resolution = if self.vm_linking {
            "AllowAutoConflictResolution"
        } else {
            "NoConflictResolution"
        };
        let mut body = json!({
            "hostname": self.hostname,
            "username": self.username,
            "password": self.password.expose_secret(),
            "conflictResolutionAuthz": conflict_resolution,
        });
        if let (Some(ca), Some(map)) = (&self.ca_certificate, body.as_object_mut()) {
            map.insert("caCerts".into(), Value::String(ca.clone()));
        }
        body
    }
}

/// Bootstrap parameters for a fresh cluster.
#[derive(Debug)]
pub struct BootstrapRequest {
    pub cluster_name: String,
    pub admin_email: String,
    pub admin_password: SecretString,
    pub management_gateway: String,
    pub management_subnet_mask: String,
    pub dns_search_domains: Vec<String>,
    pub dns_name_servers: Vec<String>,
    pub ntp_servers: Vec<String>,
    /// Node name → management IP.
    pub node_config: BTreeMap<String, String>,
    pub enable_encryption: bool,
    pub wait_for_completion: bool,
}

impl BootstrapRequest {
    pub(crate) fn body(&self) -> Value {
        let node_configs: serde_json::Map<String, Value> = self
            .node_config
            .iter()
            .map(|(node, ip)| {
                let cfg = json!({
                    "managementIpConfig": {
                        "netmask": self.management_subnet_mask,
                        "gateway": self.management_gateway,
                        "address": ip,
                    }
                });
                (node.clone(), cfg)
            })
            .collect();

        json!({
            "enableSoftwareEncryptionAtRest": self.enable_encryption,
            "name": self.cluster_name,
            "dnsNameservers": self.dns_name_servers,
            "dnsSearchDomains": self.dns_search_domains,
            "ntpServers": self.ntp_servers,
            "adminUserInfo": {
                "password": self.admin_password.expose_secret(),
                "emailAddress": self.admin_email,
                "id": "admin",
            },
            "nodeConfigs": node_configs,
        })
    }
}

// ── Cloud ──────────────────────────────────────────────────────────

/// Client-side encryption of an S3 archive.
#[derive(Debug)]
pub enum S3Encryption {
    /// RSA private key, PEM encoded.
    Rsa(SecretString),
    /// AWS KMS master key id.
    Kms(String),
}

#[derive(Debug)]
pub struct S3ArchiveRequest {
    pub archive_name: String,
    pub bucket: String,
    pub region: String,
    pub storage_class: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub encryption: S3Encryption,
}

impl S3ArchiveRequest {
    /// Fields the cluster echoes back in the archive definition.
    pub(crate) fn comparable(&self) -> Value {
        json!({
            "name": self.archive_name,
            "bucket": self.bucket.to_lowercase(),
            "defaultRegion": self.region,
            "storageClass": self.storage_class.to_uppercase(),
            "accessKey": self.access_key,
            "objectStoreType": "S3",
        })
    }

    pub(crate) fn body(&self) -> Value {
        let mut body = self.comparable();
        if let Some(map) = body.as_object_mut() {
            map.insert(
                "secretKey".into(),
                Value::String(self.secret_key.expose_secret().to_owned()),
            );
            match &self.encryption {
                S3Encryption::Rsa(pem) => {
                    map.insert(
                        "pemFileContent".into(),
                        Value::String(pem.expose_secret().to_owned()),
                    );
                }
                S3Encryption::Kms(key_id) => {
                    map.insert("kmsMasterKeyId".into(), Value::String(key_id.clone()));
                }
            }
        }
        body
    }
}

#[derive(Debug)]
pub struct AzureArchiveRequest {
    pub archive_name: String,
    pub container: String,
    pub storage_account_name: String,
    pub access_key: SecretString,
    pub instance_type: AzureInstanceType,
    /// RSA private key, PEM encoded.
    pub rsa_key: SecretString,
}

impl AzureArchiveRequest {
    pub(crate) fn comparable(&self) -> Value {
        let mut desired = json!({
            "objectStoreType": "Azure",
            "name": self.archive_name,
            "accessKey": self.storage_account_name,
            "bucket": self.container,
        });
        if let (Some(endpoint), Some(map)) = (self.instance_type.endpoint(), desired.as_object_mut())
        {
            map.insert("endpoint".into(), Value::String(endpoint.to_owned()));
        }
        desired
    }

    pub(crate) fn body(&self) -> Value {
        let mut body = self.comparable();
        if let Some(map) = body.as_object_mut() {
            map.insert(
                "secretKey".into(),
                Value::String(self.access_key.expose_secret().to_owned()),
            );
            map.insert(
                "pemFileContent".into(),
                Value::String(self.rsa_key.expose_secret().to_owned()),
            );
        }
        body
    }
}

/// CloudOn conversion settings for an existing Azure archive.
#[derive(Debug)]
pub struct AzureCloudOnRequest {
    pub archive_name: String,
    pub container: String,
    pub storage_account_name: String,
    pub application_id: String,
    pub application_key: SecretString,
    pub directory_id: String,
    pub region: String,
    /// Full resource id: `/subscriptions/{sub}/resourceGroups/{rg}/...`.
    pub virtual_network_id: String,
    pub subnet_name: String,
    pub security_group_id: String,
}

impl AzureCloudOnRequest {
    /// `(subscription id, resource group id)` from the virtual network id.
    pub(crate) fn vnet_parts(&self) -> Option<(&str, &str)> {
        let mut parts = self.virtual_network_id.split('/');
        let subscription = parts.nth(2)?;
        let resource_group = parts.nth(1)?;
        Some((subscription, resource_group))
    }
}

#[derive(Debug)]
pub struct AwsNativeAccountRequest {
    pub name: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub regions: Vec<String>,
    pub regional_bolt_network_configs: Vec<BoltNetworkConfig>,
}

impl AwsNativeAccountRequest {
    pub(crate) fn body(&self) -> Value {
        json!({
            "name": self.name,
            "accessKey": self.access_key,
            "secretKey": self.secret_key.expose_secret(),
            "regions": self.regions,
            "regionalBoltNetworkConfigs": self.regional_bolt_network_configs,
        })
    }
}
