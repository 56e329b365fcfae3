// ── Cluster operations ──
//
// Version and node queries, bootstrap and registration, and the idempotent
// configuration of cluster-wide settings (timezone, NTP, syslog, DNS, SMTP,
// VLAN, vCenter).

use std::collections::BTreeMap;
use std::time::Duration;

use cdm_api::{
    ApiVersion, Error as ApiError, JobReport, ObjectType, ValueExt, is_equivalent, matches_stripped,
    url_codec,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::{Cdm, data_objects};
use crate::error::CoreError;
use crate::model::{ClusterProperties, SmtpInstance, SyslogServer};
use crate::outcome::Outcome;
use crate::requests::{BootstrapRequest, SmtpSettings, VcenterRequest};
use crate::strip::ResourceKind;
use crate::validation::{SyslogProtocol, TIMEZONES, ensure_member};

impl Cdm {
    // ── Queries ──────────────────────────────────────────────────────

    /// CDM release running on the cluster, e.g. `5.0.1-1280`.
    pub async fn cluster_version(&self, timeout: Option<Duration>) -> Result<String, CoreError> {
        let me = self
            .get(ApiVersion::V1, "/cluster/me/version", timeout)
            .await?;
        Ok(me.str_field("version")?.to_owned())
    }

    /// Fail with `UnsupportedVersion` unless the cluster runs `minimum`
    /// (`major.minor`) or later.
    pub async fn cluster_version_check(
        &self,
        minimum: &str,
        timeout: Option<Duration>,
    ) -> Result<(), CoreError> {
        let required = major_minor(minimum).ok_or_else(|| {
            CoreError::validation(format!("'{minimum}' is not a major.minor CDM version"))
        })?;
        let actual = self.cluster_version(timeout).await?;
        match major_minor(&actual) {
            Some(current) if current >= required => Ok(()),
            _ => Err(CoreError::UnsupportedVersion {
                required: minimum.to_owned(),
                actual,
            }),
        }
    }

    /// Management IP of every node.
    pub async fn cluster_node_ips(&self, timeout: Option<Duration>) -> Result<Vec<String>, CoreError> {
        self.node_field("ipAddress", timeout).await
    }

    /// Id (node name) of every node.
    pub async fn cluster_node_names(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<String>, CoreError> {
        self.node_field("id", timeout).await
    }

    async fn node_field(
        &self,
        field: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<String>, CoreError> {
        let nodes = self
            .get(ApiVersion::Internal, "/cluster/me/node", timeout)
            .await?;
        data_objects(&nodes)?
            .into_iter()
            .map(|node| -> Result<_, CoreError> { Ok(node.str_field(field)?.to_owned()) })
            .collect()
    }

    /// Whether the node has been bootstrapped.
    ///
    /// A node that is still starting up does not answer; the check retries
    /// while it is unreachable, up to the configured attempt budget.
    pub async fn cluster_bootstrap_status(
        &self,
        timeout: Option<Duration>,
    ) -> Result<bool, CoreError> {
        let timeout = self.timeout(timeout);
        let attempts = self.config().bootstrap_check_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .dispatcher()
                .get(ApiVersion::Internal, "/node_management/is_bootstrapped", timeout)
                .await
            {
                Ok(status) => return Ok(status.into_value().bool_field("value")?),
                Err(e @ ApiError::Unreachable { .. }) if attempt >= attempts => {
                    return Err(e.into());
                }
                Err(ApiError::Unreachable { .. }) => {
                    debug!(attempt, attempts, "node not answering yet");
                    self.pause(self.config().bootstrap_check_interval).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ── Bootstrap & registration ─────────────────────────────────────

    /// Bootstrap a fresh cluster. Needs anonymous credentials.
    ///
    /// With `wait_for_completion`, polls the bootstrap request until it
    /// leaves `IN_PROGRESS` and returns the final status document.
    pub async fn bootstrap(
        &self,
        request: &BootstrapRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let credentials = self.dispatcher().credentials();
        if !credentials.is_anonymous() {
            return Err(CoreError::validation(
                "When bootstrapping a cluster the username must be empty",
            ));
        }
        if !credentials.has_empty_password() {
            return Err(CoreError::validation(
                "When bootstrapping a cluster the password must be empty",
            ));
        }

        if self.cluster_bootstrap_status(timeout).await? {
            return Ok(Outcome::no_change(
                "The provided node is already bootstrapped.",
            ));
        }

        let timeout = self.timeout(timeout);
        let started = self
            .dispatcher()
            .post(ApiVersion::Internal, "/cluster/me/bootstrap", &request.body(), timeout)
            .await?
            .into_value();
        if !request.wait_for_completion {
            return Ok(Outcome::Applied(started));
        }

        let request_id = match started.require("id", "a bootstrap request id")? {
            Value::String(s) => s.clone(),
            other => other
                .as_u64()
                .map_or_else(|| other.to_string(), |n| n.to_string()),
        };
        let endpoint = format!(
            "/cluster/me/bootstrap?request_id={}",
            url_codec::query_value(&request_id)
        );
        let url = self.dispatcher().api_url(ApiVersion::Internal, &endpoint)?;
        match self.config().poll_deadline {
            Some(limit) => tokio::time::timeout(limit, self.await_bootstrap(&url, &request_id, timeout))
                .await
                .map_err(|_| {
                    CoreError::from(ApiError::DeadlineExceeded {
                        deadline_secs: limit.as_secs(),
                    })
                })?,
            None => self.await_bootstrap(&url, &request_id, timeout).await,
        }
    }

    /// Poll a bootstrap request until it leaves `IN_PROGRESS`.
    async fn await_bootstrap(
        &self,
        url: &str,
        request_id: &str,
        timeout: Duration,
    ) -> Result<Outcome<Value>, CoreError> {
        loop {
            let status = self
                .dispatcher()
                .get_job_status(url, timeout)
                .await?
                .into_value();
            match status.str_field("status")? {
                "IN_PROGRESS" => {
                    debug!(request_id, "bootstrap in progress");
                    self.pause(self.config().bootstrap_poll_interval).await?;
                }
                "FAILURE" | "FAILED" => {
                    let message = status.str_field("message").unwrap_or("Bootstrap failed");
                    return Err(ApiError::JobFailed {
                        message: message.to_owned(),
                    }
                    .into());
                }
                _ => return Ok(Outcome::Applied(status)),
            }
        }
    }

    /// Register the cluster with a support portal account.
    pub async fn register_cluster(
        &self,
        username: &str,
        password: &SecretString,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let registered = self
            .get(ApiVersion::Internal, "/cluster/me/is_registered", timeout)
            .await?;
        if registered.bool_field("value").unwrap_or(false) {
            return Ok(Outcome::no_change(
                "No change required. The cluster is already registered.",
            ));
        }

        let body = json!({"username": username, "password": password.expose_secret()});
        let timeout = timeout.unwrap_or(self.config().register_timeout);
        let result = self
            .post(ApiVersion::Internal, "/cluster/me/register", &body, Some(timeout))
            .await?;
        Ok(Outcome::Applied(result))
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn configure_timezone(
        &self,
        timezone: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<ClusterProperties>, CoreError> {
        ensure_member("timezone", timezone, TIMEZONES)?;

        let me = self.get(ApiVersion::V1, "/cluster/me", timeout).await?;
        let current = me
            .object_field("timezone")
            .ok()
            .and_then(|tz| tz.str_field("timezone").ok());
        if current == Some(timezone) {
            return Ok(Outcome::no_change(format!(
                "No change required. The cluster is already configured with '{timezone}' as its timezone."
            )));
        }

        let body = json!({"timezone": {"timezone": timezone}});
        let props = self
            .dispatcher()
            .patch(ApiVersion::V1, "/cluster/me", &body, self.timeout(timeout))
            .await?
            .decode()?;
        Ok(Outcome::Applied(props))
    }

    pub async fn configure_ntp(
        &self,
        servers: &[String],
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        self.configure_list(
            "/cluster/me/ntp_server",
            servers,
            format!(
                "No change required. The NTP server(s) {servers:?} have already been added to the cluster."
            ),
            timeout,
        )
        .await
    }

    pub async fn configure_dns_servers(
        &self,
        servers: &[String],
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        self.configure_list(
            "/cluster/me/dns_nameserver",
            servers,
            "No change required. The cluster is already configured with the provided DNS servers."
                .to_owned(),
            timeout,
        )
        .await
    }

    pub async fn configure_search_domain(
        &self,
        domains: &[String],
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        self.configure_list(
            "/cluster/me/dns_search_domain",
            domains,
            "No change required. The cluster is already configured with the provided DNS search domains."
                .to_owned(),
            timeout,
        )
        .await
    }

    /// Ordered string-list settings: replace the list unless it already matches.
    async fn configure_list(
        &self,
        endpoint: &str,
        desired: &[String],
        unchanged: String,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let current = self.get(ApiVersion::Internal, endpoint, timeout).await?;
        let desired_value = json!(desired);
        if is_equivalent(&desired_value, &Value::Array(current.data()?.clone())) {
            return Ok(Outcome::no_change(unchanged));
        }
        let result = self
            .post(ApiVersion::Internal, endpoint, &desired_value, timeout)
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Point the cluster at a syslog server, replacing a different one.
    pub async fn configure_syslog(
        &self,
        server: &str,
        protocol: SyslogProtocol,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Outcome<SyslogServer>, CoreError> {
        let desired = json!({"hostname": server, "protocol": protocol.to_string(), "port": port});

        let current = self.get(ApiVersion::Internal, "/syslog", timeout).await?;
        if let Some(active) = data_objects(&current)?.first() {
            let observed = Value::Object((*active).clone());
            let strip = self.config().strip.get(ResourceKind::Syslog);
            if matches_stripped(&desired, &observed, &strip) {
                return Ok(Outcome::no_change(format!(
                    "No change required. The cluster is already configured to use the syslog server '{server}' on port '{port}' using the '{protocol}' protocol."
                )));
            }
            let id = active.str_field("id").unwrap_or("1");
            debug!(id, "removing existing syslog server");
            self.delete(ApiVersion::Internal, &format!("/syslog/{id}"), timeout)
                .await?;
        }

        let created = self
            .dispatcher()
            .post(ApiVersion::Internal, "/syslog", &desired, self.timeout(timeout))
            .await?
            .decode()?;
        Ok(Outcome::Applied(created))
    }

    /// Create the SMTP instance, or update the existing one if it differs.
    pub async fn configure_smtp(
        &self,
        settings: &SmtpSettings,
        timeout: Option<Duration>,
    ) -> Result<Outcome<SmtpInstance>, CoreError> {
        let desired = settings.comparable();
        let current = self
            .get(ApiVersion::Internal, "/smtp_instance", timeout)
            .await?;
        let instances = data_objects(&current)?;

        let Some(instance) = instances.first() else {
            let mut body = desired;
            if let Some(map) = body.as_object_mut() {
                map.insert(
                    "smtpPassword".into(),
                    Value::String(settings.password.expose_secret().to_owned()),
                );
            }
            let created = self
                .dispatcher()
                .post(ApiVersion::Internal, "/smtp_instance", &body, self.timeout(timeout))
                .await?
                .decode()?;
            return Ok(Outcome::Applied(created));
        };

        let observed = Value::Object((*instance).clone());
        let strip = self.config().strip.get(ResourceKind::Smtp);
        if matches_stripped(&desired, &observed, &strip) {
            return Ok(Outcome::no_change(
                "No change required. The cluster is already configured with the provided SMTP settings.",
            ));
        }

        let id = instance.str_field("id")?;
        let updated = self
            .dispatcher()
            .patch(
                ApiVersion::Internal,
                &format!("/smtp_instance/{id}"),
                &desired,
                self.timeout(timeout),
            )
            .await?
            .decode()?;
        Ok(Outcome::Applied(updated))
    }

    /// Configure VLAN tagging. `ips` maps node name to its VLAN interface IP.
    pub async fn configure_vlan(
        &self,
        netmask: &str,
        vlan: u16,
        ips: &BTreeMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let interfaces: Vec<Value> = ips
            .iter()
            .map(|(node, ip)| json!({"node": node, "ip": ip}))
            .collect();
        let desired = json!({"vlan": vlan, "netmask": netmask, "interfaces": interfaces});

        let current = self
            .get(ApiVersion::Internal, "/cluster/me/vlan", timeout)
            .await?;
        let strip = self.config().strip.get(ResourceKind::Vlan);
        let configured = data_objects(&current)?
            .into_iter()
            .any(|v| matches_stripped(&desired, &Value::Object(v.clone()), &strip));
        if configured {
            return Ok(Outcome::no_change(
                "No change required. The cluster is already configured with the provided VLAN information.",
            ));
        }

        let result = self
            .post(ApiVersion::Internal, "/cluster/me/vlan", &desired, timeout)
            .await?;
        Ok(Outcome::Applied(result))
    }

    // ── vCenter ──────────────────────────────────────────────────────

    /// Add a vCenter server and wait for the add job.
    pub async fn add_vcenter(
        &self,
        request: &VcenterRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        let current = self
            .get(ApiVersion::V1, "/vmware/vcenter?primary_cluster_id=local", timeout)
            .await?;
        let present = data_objects(&current)?
            .iter()
            .any(|vc| vc.str_field("hostname").is_ok_and(|h| h == request.hostname));
        if present {
            return Ok(Outcome::no_change(format!(
                "No change required. The vCenter '{}' has already been added to the cluster.",
                request.hostname
            )));
        }

        let timeout = self.job_timeout(timeout);
        let created = self
            .dispatcher()
            .post(ApiVersion::V1, "/vmware/vcenter", &request.body(), timeout)
            .await?;
        let report = self.wait_linked(&created, timeout).await?;
        Ok(Outcome::Applied(report))
    }

    /// Refresh vCenter metadata and wait for the refresh job.
    pub async fn refresh_vcenter(
        &self,
        hostname: &str,
        timeout: Option<Duration>,
    ) -> Result<JobReport, CoreError> {
        let timeout = self.job_timeout(timeout);
        let id = self
            .resolve(ObjectType::Vcenter, hostname, None, timeout)
            .await?;
        let refresh = self
            .dispatcher()
            .post(
                ApiVersion::V1,
                &format!("/vmware/vcenter/{id}/refresh"),
                &json!({}),
                timeout,
            )
            .await?;
        self.wait_linked(&refresh, timeout).await
    }

    // ── Authorization ────────────────────────────────────────────────

    /// Grant an End User restore rights on a VMware VM.
    pub async fn end_user_authorization(
        &self,
        vm_name: &str,
        end_user: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let request_timeout = self.timeout(timeout);
        let vm_id = self
            .resolve(ObjectType::Vmware, vm_name, None, request_timeout)
            .await?;

        let users = self
            .get(
                ApiVersion::Internal,
                &format!("/user?username={}", url_codec::query_value(end_user)),
                timeout,
            )
            .await?;
        let user_id = users
            .as_array()
            .and_then(|u| u.first())
            .and_then(|u| u.str_field("id").ok())
            .ok_or_else(|| CoreError::not_found("End User account", end_user))?
            .to_owned();

        let authorization = self
            .get(
                ApiVersion::Internal,
                &format!("/authorization/role/end_user?principals={user_id}"),
                timeout,
            )
            .await?;
        let authorized = data_objects(&authorization)?
            .first()
            .and_then(|a| a.object_field("privileges").ok())
            .and_then(|p| p.array_field("restore").ok())
            .is_some_and(|restore| restore.iter().any(|id| id.as_str() == Some(vm_id.as_str())));
        if authorized {
            return Ok(Outcome::no_change(format!(
                "No change required. The End User '{end_user}' is already authorized to interact with the '{vm_name}' VM."
            )));
        }

        let body = json!({
            "principals": [user_id],
            "privileges": {"restore": [vm_id]},
        });
        let result = self
            .post(ApiVersion::Internal, "/authorization/role/end_user", &body, timeout)
            .await?;
        Ok(Outcome::Applied(result))
    }
}

/// `(major, minor)` of a version string such as `5.0.1-p2-1280`.
fn major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split(['.', '-']);
    let major = parts.next()?.trim().parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None => {
            warn!(version, "version has no minor component");
            0
        }
    };
    Some((major, minor))
}
