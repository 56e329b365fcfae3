// Object name → id resolution.
//
// The cluster's search endpoints match loosely (prefix or substring), so the
// result set is filtered again client-side on the exact match field.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::endpoint::ApiVersion;
use crate::error::Error;
use crate::url_codec;
use crate::value::ValueExt;

/// Kinds of objects that can be resolved by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Vmware,
    Sla,
    VmwareHost,
    PhysicalHost,
    FilesetTemplate,
    ManagedVolume,
    Vcenter,
    Ec2,
    Ahv,
}

impl ObjectType {
    /// Response field compared against the requested name.
    pub fn match_field(self) -> &'static str {
        match self {
            Self::PhysicalHost => "hostname",
            Self::Ec2 => "instanceId",
            _ => "name",
        }
    }

    /// Search endpoint for `name`.
    fn search(self, name: &str, host_os: Option<HostOs>) -> Result<(ApiVersion, String), Error> {
        let name = url_codec::query_value(name);
        let target = match self {
            Self::Vmware => (
                ApiVersion::V1,
                format!("/vmware/vm?primary_cluster_id=local&is_relic=false&name={name}"),
            ),
            Self::Sla => (
                ApiVersion::V1,
                format!("/sla_domain?primary_cluster_id=local&name={name}"),
            ),
            Self::VmwareHost => (
                ApiVersion::V1,
                "/vmware/host?primary_cluster_id=local".to_owned(),
            ),
            Self::PhysicalHost => (
                ApiVersion::V1,
                format!("/host?primary_cluster_id=local&hostname={name}"),
            ),
            Self::FilesetTemplate => {
                let os = host_os.ok_or_else(|| Error::InvalidArgument {
                    field: "host_os",
                    reason: "a fileset template lookup needs the host OS (Linux or Windows)".into(),
                })?;
                (
                    ApiVersion::V1,
                    format!(
                        "/fileset_template?primary_cluster_id=local&operating_system_type={os}&name={name}"
                    ),
                )
            }
            Self::ManagedVolume => (
                ApiVersion::Internal,
                format!("/managed_volume?is_relic=false&primary_cluster_id=local&name={name}"),
            ),
            Self::Vcenter => (ApiVersion::V1, "/vmware/vcenter".to_owned()),
            Self::Ec2 => (
                ApiVersion::Internal,
                format!(
                    "/aws/ec2_instance?name={name}&is_relic=false&sort_by=instanceId&sort_order=asc"
                ),
            ),
            Self::Ahv => (
                ApiVersion::Internal,
                format!("/nutanix/vm?primary_cluster_id=local&is_relic=false&name={name}"),
            ),
        };
        Ok(target)
    }
}

/// Operating system of a physical host or fileset template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum HostOs {
    Linux,
    Windows,
}

/// Looks up object ids by exact name.
#[derive(Debug, Clone)]
pub struct ObjectResolver {
    dispatcher: Dispatcher,
    timeout: Duration,
}

impl ObjectResolver {
    pub fn new(dispatcher: Dispatcher, timeout: Duration) -> Self {
        Self {
            dispatcher,
            timeout,
        }
    }

    /// Id of the single `object_type` object whose match field equals `name`.
    pub async fn resolve(
        &self,
        object_type: ObjectType,
        name: &str,
        host_os: Option<HostOs>,
    ) -> Result<String, Error> {
        let (version, endpoint) = object_type.search(name, host_os)?;
        let listing = self
            .dispatcher
            .get(version, &endpoint, self.timeout)
            .await?
            .into_value();

        let not_found = || Error::ObjectNotFound {
            object_type: object_type.to_string(),
            name: name.to_owned(),
        };

        if listing.f64_field("total").unwrap_or(0.0) <= 0.0 {
            return Err(not_found());
        }

        let field = object_type.match_field();
        let mut ids = listing
            .data()?
            .iter()
            .filter(|item| item.str_field(field).is_ok_and(|v| v == name))
            .map(|item| item.str_field("id").map(str::to_owned));

        let Some(first) = ids.next() else {
            return Err(not_found());
        };
        if ids.next().is_some() {
            return Err(Error::AmbiguousObject {
                object_type: object_type.to_string(),
                name: name.to_owned(),
            });
        }

        let id = first?;
        debug!(%object_type, name, id, "resolved object");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_names() {
        assert_eq!(ObjectType::PhysicalHost.to_string(), "physicalHost");
        assert_eq!("filesetTemplate".parse::<ObjectType>().ok(), Some(ObjectType::FilesetTemplate));
        assert_eq!("ec2".parse::<ObjectType>().ok(), Some(ObjectType::Ec2));
        assert!("nutanix".parse::<ObjectType>().is_err());
    }

    #[test]
    fn match_fields() {
        assert_eq!(ObjectType::PhysicalHost.match_field(), "hostname");
        assert_eq!(ObjectType::Ec2.match_field(), "instanceId");
        assert_eq!(ObjectType::Sla.match_field(), "name");
    }

    #[test]
    fn fileset_template_requires_host_os() {
        let err = ObjectType::FilesetTemplate.search("fs", None);
        assert!(matches!(err, Err(e) if e.is_validation()));

        let ok = ObjectType::FilesetTemplate.search("fs", Some(HostOs::Windows));
        assert!(matches!(ok, Ok((_, ep)) if ep.contains("operating_system_type=Windows")));
    }

    #[test]
    fn search_versions() {
        let version = |t: ObjectType| t.search("x", Some(HostOs::Linux)).map(|(v, _)| v).ok();
        assert_eq!(version(ObjectType::ManagedVolume), Some(ApiVersion::Internal));
        assert_eq!(version(ObjectType::Ahv), Some(ApiVersion::Internal));
        assert_eq!(version(ObjectType::Vcenter), Some(ApiVersion::V1));
    }
}
