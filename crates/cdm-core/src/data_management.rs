// ── Data management operations ──
//
// SLA assignment, managed volume snapshot windows, snapshot pause/resume
// and on-demand snapshots. Object names are resolved to ids on every call.

use std::collections::BTreeMap;
use std::time::Duration;

use cdm_api::{ApiVersion, HostOs, JobHandle, ObjectType, ValueExt};
use serde_json::{Value, json};

use crate::client::{Cdm, data_objects};
use crate::error::CoreError;
use crate::outcome::Outcome;
use crate::validation::SlaTarget;

/// SLA name that keeps the object's current assignment.
const CURRENT_SLA: &str = "current";

impl Cdm {
    /// Assign a VMware or AHV VM to an SLA domain.
    ///
    /// `sla_name` may also be `do not protect` or `clear`.
    pub async fn assign_sla(
        &self,
        object_name: &str,
        object_type: ObjectType,
        sla_name: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let summary_path = match object_type {
            ObjectType::Vmware => (ApiVersion::V1, "/vmware/vm"),
            ObjectType::Ahv => (ApiVersion::Internal, "/nutanix/vm"),
            _ => {
                return Err(CoreError::validation(
                    "The object type must be 'vmware' or 'ahv'.",
                ));
            }
        };

        let timeout_value = self.timeout(timeout);
        let target = SlaTarget::parse(sla_name);
        let sla_id = match target.reserved_id() {
            Some(id) => id.to_owned(),
            None => {
                self.resolve(ObjectType::Sla, sla_name, None, timeout_value)
                    .await?
            }
        };

        let vm_id = self
            .resolve(object_type, object_name, None, timeout_value)
            .await?;
        let (version, base) = summary_path;
        let summary = self
            .get(version, &format!("{base}/{vm_id}"), timeout)
            .await?;

        let current_field = if target == SlaTarget::Clear {
            "configuredSlaDomainId"
        } else {
            "effectiveSlaDomainId"
        };
        if summary.str_field(current_field).is_ok_and(|id| id == sla_id) {
            return Ok(Outcome::no_change(format!(
                "No change required. The {object_type} VM '{object_name}' is already assigned to the '{sla_name}' SLA Domain."
            )));
        }

        let body = json!({"managedIds": [vm_id]});
        let result = self
            .post(
                ApiVersion::Internal,
                &format!("/sla_domain/{sla_id}/assign"),
                &body,
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Open a managed volume for writes.
    pub async fn begin_managed_volume_snapshot(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let (id, writable) = self.managed_volume_state(name, timeout).await?;
        if writable {
            return Ok(Outcome::no_change(format!(
                "No change required. The Managed Volume '{name}' is already in a writeable state."
            )));
        }

        let result = self
            .post(
                ApiVersion::Internal,
                &format!("/managed_volume/{id}/begin_snapshot"),
                &json!({}),
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Close a managed volume for writes, taking a snapshot.
    ///
    /// `sla_name` of `current` keeps the volume's own SLA; any other name
    /// sets the snapshot's retention SLA.
    pub async fn end_managed_volume_snapshot(
        &self,
        name: &str,
        sla_name: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let (id, writable) = self.managed_volume_state(name, timeout).await?;
        if !writable {
            return Ok(Outcome::no_change(format!(
                "No change required. The Managed Volume '{name}' is already in a read-only state."
            )));
        }

        let body = if sla_name == CURRENT_SLA {
            json!({})
        } else {
            let sla_id = self
                .resolve(ObjectType::Sla, sla_name, None, self.timeout(timeout))
                .await?;
            json!({"retentionConfig": {"slaId": sla_id}})
        };
        let result = self
            .post(
                ApiVersion::Internal,
                &format!("/managed_volume/{id}/end_snapshot"),
                &body,
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    async fn managed_volume_state(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<(String, bool), CoreError> {
        let id = self
            .resolve(ObjectType::ManagedVolume, name, None, self.timeout(timeout))
            .await?;
        let summary = self
            .get(ApiVersion::Internal, &format!("/managed_volume/{id}"), timeout)
            .await?;
        let writable = summary.bool_field("isWritable")?;
        Ok((id, writable))
    }

    /// Name → id of every VMware VM protected by `sla_name`.
    ///
    /// Empty when the SLA protects nothing.
    pub async fn get_sla_objects(
        &self,
        sla_name: &str,
        object_type: ObjectType,
        timeout: Option<Duration>,
    ) -> Result<BTreeMap<String, String>, CoreError> {
        ensure_vmware(object_type)?;
        let sla_id = self
            .resolve(ObjectType::Sla, sla_name, None, self.timeout(timeout))
            .await?;
        let listing = self
            .get(
                ApiVersion::V1,
                &format!("/vmware/vm?effective_sla_domain_id={sla_id}&is_relic=false"),
                timeout,
            )
            .await?;
        if listing.f64_field("total").unwrap_or(0.0) <= 0.0 {
            return Ok(BTreeMap::new());
        }

        data_objects(&listing)?
            .into_iter()
            .map(|vm| -> Result<_, CoreError> {
                Ok((vm.str_field("name")?.to_owned(), vm.str_field("id")?.to_owned()))
            })
            .collect()
    }

    /// Suspend all snapshot activity for a VMware VM.
    pub async fn pause_snapshot(
        &self,
        object_name: &str,
        object_type: ObjectType,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        self.set_snapshot_pause(object_name, object_type, true, timeout)
            .await
    }

    /// Resume snapshot activity for a VMware VM.
    pub async fn resume_snapshot(
        &self,
        object_name: &str,
        object_type: ObjectType,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        self.set_snapshot_pause(object_name, object_type, false, timeout)
            .await
    }

    async fn set_snapshot_pause(
        &self,
        object_name: &str,
        object_type: ObjectType,
        paused: bool,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        ensure_vmware(object_type)?;
        let timeout = self.job_timeout(timeout);
        let vm_id = self
            .resolve(ObjectType::Vmware, object_name, None, timeout)
            .await?;
        let endpoint = format!("/vmware/vm/{vm_id}");
        let summary = self.get(ApiVersion::V1, &endpoint, Some(timeout)).await?;

        let active = summary
            .object_field("blackoutWindowStatus")?
            .bool_field("isSnappableBlackoutActive")?;
        if active == paused {
            let state = if paused { "already paused" } else { "currently not paused" };
            return Ok(Outcome::no_change(format!(
                "No change required. The '{object_name}' '{object_type}' is {state}."
            )));
        }

        let result = self
            .patch(
                ApiVersion::V1,
                &endpoint,
                &json!({"isVmPaused": paused}),
                Some(timeout),
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Start an on-demand snapshot of a VMware VM and return its job handle.
    ///
    /// `sla_name` of `current` uses the VM's effective SLA.
    pub async fn on_demand_snapshot_vm(
        &self,
        object_name: &str,
        object_type: ObjectType,
        sla_name: &str,
        timeout: Option<Duration>,
    ) -> Result<JobHandle, CoreError> {
        ensure_vmware(object_type)?;
        let timeout = self.job_timeout(timeout);
        let vm_id = self
            .resolve(ObjectType::Vmware, object_name, None, timeout)
            .await?;

        let sla_id = if sla_name == CURRENT_SLA {
            let summary = self
                .get(ApiVersion::V1, &format!("/vmware/vm/{vm_id}"), Some(timeout))
                .await?;
            summary.str_field("effectiveSlaDomainId")?.to_owned()
        } else {
            self.resolve(ObjectType::Sla, sla_name, None, timeout)
                .await?
        };

        let started = self
            .dispatcher()
            .post(
                ApiVersion::V1,
                &format!("/vmware/vm/{vm_id}/snapshot"),
                &json!({"slaId": sla_id}),
                timeout,
            )
            .await?;
        Ok(JobHandle::from_response(&started)?)
    }

    /// Start an on-demand snapshot of a physical host's fileset and return
    /// its job handle.
    pub async fn on_demand_snapshot_physical(
        &self,
        hostname: &str,
        sla_name: &str,
        fileset: &str,
        host_os: HostOs,
        timeout: Option<Duration>,
    ) -> Result<JobHandle, CoreError> {
        let timeout = self.job_timeout(timeout);
        let host_id = self
            .resolve(ObjectType::PhysicalHost, hostname, None, timeout)
            .await?;
        let template_id = self
            .resolve(ObjectType::FilesetTemplate, fileset, Some(host_os), timeout)
            .await?;

        let filesets = self
            .get(
                ApiVersion::V1,
                &format!(
                    "/fileset?primary_cluster_id=local&host_id={host_id}&is_relic=false&template_id={template_id}"
                ),
                Some(timeout),
            )
            .await?;
        let assigned = data_objects(&filesets)?;
        let Some(assignment) = assigned.first() else {
            return Err(CoreError::validation(format!(
                "The Physical Host '{hostname}' is not assigned to the '{fileset}' Fileset."
            )));
        };
        let fileset_id = assignment.str_field("id")?;

        let sla_id = if sla_name == CURRENT_SLA {
            assignment.str_field("effectiveSlaDomainId")?.to_owned()
        } else {
            self.resolve(ObjectType::Sla, sla_name, None, timeout)
                .await?
        };

        let started = self
            .dispatcher()
            .post(
                ApiVersion::V1,
                &format!("/fileset/{fileset_id}/snapshot"),
                &json!({"slaId": sla_id}),
                timeout,
            )
            .await?;
        Ok(JobHandle::from_response(&started)?)
    }
}

fn ensure_vmware(object_type: ObjectType) -> Result<(), CoreError> {
    if object_type == ObjectType::Vmware {
        Ok(())
    } else {
        Err(CoreError::validation("The object type must be 'vmware'."))
    }
}
