// ── Cloud archive and cloud-native operations ──
//
// Archive targets (S3, Azure) are object stores; creating one starts a
// connect job that is awaited before returning. CloudOn settings and AWS
// native accounts are reconciled the same way before any write.

use std::time::Duration;

use cdm_api::{
    ApiVersion, JobHandle, JobReport, ValueExt, is_equivalent, matches_after, matches_stripped,
    url_codec,
};
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{Cdm, data_objects, decode, project};
use crate::error::CoreError;
use crate::model::{ArchiveLocation, AwsAccount, ObjectStore};
use crate::outcome::Outcome;
use crate::requests::{
    AwsNativeAccountRequest, AzureArchiveRequest, AzureCloudOnRequest, S3ArchiveRequest,
};
use crate::strip::ResourceKind;
use crate::validation::{AWS_REGIONS, AZURE_REGIONS, S3_STORAGE_CLASSES, ensure_member};

/// First CDM release with AWS native protection.
const AWS_NATIVE_MIN_VERSION: &str = "4.2";

impl Cdm {
    /// Every archive target configured on the cluster.
    pub async fn cloud_object_stores(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<ObjectStore>, CoreError> {
        let listing = self
            .get(ApiVersion::Internal, "/archive/object_store", timeout)
            .await?;
        decode(Value::Array(listing.data()?.clone()))
    }

    // ── Archive targets ──────────────────────────────────────────────

    /// Add an S3 archive target and wait for its connect job.
    pub async fn aws_s3_cloud_out(
        &self,
        request: &S3ArchiveRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        ensure_member("AWS region", &request.region, AWS_REGIONS)?;
        ensure_member(
            "storage class",
            &request.storage_class.to_lowercase(),
            S3_STORAGE_CLASSES,
        )?;

        self.create_object_store(
            ResourceKind::S3Archive,
            "S3",
            &request.archive_name,
            &request.comparable(),
            &request.body(),
            timeout,
        )
        .await
    }

    /// Add an Azure archive target and wait for its connect job.
    pub async fn azure_cloud_out(
        &self,
        request: &AzureArchiveRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        self.create_object_store(
            ResourceKind::AzureArchive,
            "Azure",
            &request.archive_name,
            &request.comparable(),
            &request.body(),
            timeout,
        )
        .await
    }

    async fn create_object_store(
        &self,
        kind: ResourceKind,
        store_type: &str,
        name: &str,
        desired: &Value,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        let timeout = self.job_timeout(timeout);
        let strip = self.config().strip.get(kind);

        for store in self.cloud_object_stores(Some(timeout)).await? {
            let observed = Value::Object(store.definition.clone());
            if matches_stripped(desired, &observed, &strip) {
                return Ok(Outcome::no_change(format!(
                    "No change required. The '{name}' archive location is already configured on the cluster."
                )));
            }
            if store.object_store_type() == Some(store_type) && store.name() == Some(name) {
                return Err(CoreError::Conflict {
                    message: format!(
                        "An archive location with the name '{name}' already exists. Please enter a unique archive name."
                    ),
                });
            }
        }

        let created = self
            .dispatcher()
            .post(ApiVersion::Internal, "/archive/object_store", body, timeout)
            .await?;
        let job_id = created.object()?.str_field("jobInstanceId")?;
        let url = self.dispatcher().api_url(
            ApiVersion::Internal,
            &format!("/archive/location/job/connect/{job_id}"),
        )?;
        debug!(name, job_id, "waiting for archive connect job");
        let report = self.wait(&JobHandle::new(url), timeout).await?;
        Ok(Outcome::Applied(report))
    }

    // ── CloudOn ──────────────────────────────────────────────────────

    /// Enable CloudOn conversion on an S3 archive.
    pub async fn aws_s3_cloud_on(
        &self,
        archive_name: &str,
        vpc_id: &str,
        subnet_id: &str,
        security_group_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let network = json!({
            "vNetId": vpc_id,
            "subnetId": subnet_id,
            "securityGroupId": security_group_id,
        });
        let store = self.find_object_store("S3", archive_name, timeout).await?;

        let observed = store
            .definition
            .get("defaultComputeNetworkConfig")
            .cloned()
            .unwrap_or(Value::Null);
        let configured = matches_after(&network, &observed, |m| {
            m.remove("resourceGroupId");
        });
        if configured {
            return Ok(Outcome::no_change(format!(
                "No change required. The '{archive_name}' archive location is already configured for CloudOn."
            )));
        }

        let body = json!({"defaultComputeNetworkConfig": network});
        let result = self
            .patch(
                ApiVersion::Internal,
                &format!("/archive/object_store/{}", store.id),
                &body,
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Enable CloudOn conversion on an Azure archive.
    pub async fn azure_cloud_on(
        &self,
        request: &AzureCloudOnRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        ensure_member("Azure region", &request.region, AZURE_REGIONS)?;
        let (subscription_id, resource_group_id) = request.vnet_parts().ok_or_else(|| {
            CoreError::validation(format!(
                "'{}' is not a valid Azure virtual network id",
                request.virtual_network_id
            ))
        })?;

        let network = json!({
            "subnetId": request.subnet_name,
            "vNetId": request.virtual_network_id,
            "securityGroupId": request.security_group_id,
            "resourceGroupId": resource_group_id,
        });
        let store = self
            .find_object_store("Azure", &request.archive_name, timeout)
            .await?;

        let observed = store.definition.get("defaultComputeNetworkConfig");
        if observed.is_some_and(|o| is_equivalent(&network, o)) {
            return Ok(Outcome::no_change(format!(
                "No change required. The '{}' archive location is already configured for CloudOn.",
                request.archive_name
            )));
        }

        let body = json!({
            "name": request.archive_name,
            "isComputeEnabled": true,
            "azureComputeSummary": {
                "tenantId": request.directory_id,
                "subscriptionId": subscription_id,
                "clientId": request.application_id,
                "region": request.region,
                "generalPurposeStorageAccountName": request.storage_account_name,
                "containerName": request.container,
                "environment": "AZURE",
            },
            "azureComputeSecret": {
                "clientSecret": request.application_key.expose_secret(),
            },
            "defaultComputeNetworkConfig": network,
        });
        let result = self
            .patch(
                ApiVersion::Internal,
                &format!("/archive/object_store/{}", store.id),
                &body,
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    async fn find_object_store(
        &self,
        store_type: &str,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<ObjectStore, CoreError> {
        self.cloud_object_stores(timeout)
            .await?
            .into_iter()
            .find(|s| s.object_store_type() == Some(store_type) && s.name() == Some(name))
            .ok_or_else(|| CoreError::not_found("archive location", name))
    }

    // ── Archive locations ────────────────────────────────────────────

    /// Patch an archive location's object store with `config` unless every
    /// key already holds the requested value.
    pub async fn update_cloud_archive_location(
        &self,
        archive_name: &str,
        config: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let location = self
            .archive_location(archive_name, timeout)
            .await?
            .ok_or_else(|| CoreError::not_found("archive location", archive_name))?;

        let endpoint = format!("/archive/object_store/{}", location.id);
        let current = self.get(ApiVersion::Internal, &endpoint, timeout).await?;
        let definition = current.object_field("definition").cloned().unwrap_or_default();
        if is_equivalent(&Value::Object(config.clone()), &project(config, &definition)) {
            return Ok(Outcome::no_change(format!(
                "No change required. The '{archive_name}' archive location already has the requested settings."
            )));
        }

        let result = self
            .patch(ApiVersion::Internal, &endpoint, config, timeout)
            .await?;
        Ok(Outcome::Applied(result))
    }

    /// Pause and delete an archive location.
    pub async fn remove_archive_location(
        &self,
        archive_name: &str,
        timeout: Option<Duration>,
    ) -> Result<Outcome<Value>, CoreError> {
        let Some(location) = self.archive_location(archive_name, timeout).await? else {
            return Ok(Outcome::no_change(format!(
                "No change required. The cluster does not contain an archive location named '{archive_name}'."
            )));
        };

        let pause = self
            .post(
                ApiVersion::Internal,
                &format!("/archive/location/{}/owner/pause", location.id),
                &json!({}),
                timeout,
            )
            .await;
        match pause {
            Ok(_) => {}
            Err(CoreError::Api(e))
                if e.api_message().is_some_and(|m| m.contains("already paused")) =>
            {
                debug!(archive_name, "archive location already paused");
            }
            Err(e) => return Err(e),
        }

        let result = self
            .delete(
                ApiVersion::Internal,
                &format!("/archive/location/{}", location.id),
                timeout,
            )
            .await?;
        Ok(Outcome::Applied(result))
    }

    async fn archive_location(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<ArchiveLocation>, CoreError> {
        let listing = self
            .get(
                ApiVersion::Internal,
                &format!("/archive/location?name={}", url_codec::query_value(name)),
                timeout,
            )
            .await?;
        let locations: Vec<ArchiveLocation> = decode(Value::Array(listing.data()?.clone()))?;
        Ok(locations.into_iter().find(|l| l.name == name))
    }

    // ── AWS native accounts ──────────────────────────────────────────

    /// Add an AWS native account and wait for the add job.
    ///
    /// An account already using the same access key is reported as
    /// `NoChange`; another account with the same name is a conflict.
    pub async fn add_aws_native_account(
        &self,
        request: &AwsNativeAccountRequest,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        let timeout = self.job_timeout(timeout);
        self.cluster_version_check(AWS_NATIVE_MIN_VERSION, Some(timeout))
            .await?;
        for region in &request.regions {
            ensure_member("AWS region", region, AWS_REGIONS)?;
        }

        for summary in self.aws_accounts(Some(timeout)).await? {
            let account = self.aws_account(&summary.id, Some(timeout)).await?;
            if account.access_key == request.access_key {
                return Ok(Outcome::no_change(format!(
                    "No change required. A cloud native source with access key '{}' is already configured on the cluster.",
                    request.access_key
                )));
            }
            if account.name == request.name {
                return Err(CoreError::Conflict {
                    message: format!(
                        "A cloud native source with name '{}' already exists. Please enter a unique account name.",
                        request.name
                    ),
                });
            }
        }

        let created = self
            .dispatcher()
            .post(ApiVersion::Internal, "/aws/account", &request.body(), timeout)
            .await?;
        let report = self.wait_linked(&created, timeout).await?;
        Ok(Outcome::Applied(report))
    }

    /// Full definition of the AWS native account named `name`.
    pub async fn aws_account_summary(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<AwsAccount, CoreError> {
        let summary = self
            .aws_accounts(timeout)
            .await?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| CoreError::not_found("AWS native account", name))?;
        self.aws_account(&summary.id, timeout).await
    }

    /// Patch an AWS native account with `config` unless every key already
    /// holds the requested value.
    pub async fn update_aws_native_account(
        &self,
        name: &str,
        config: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Outcome<AwsAccount>, CoreError> {
        let summary = self.aws_account_summary(name, timeout).await?;
        let endpoint = format!("/aws/account/{}", summary.id);

        let current = self.get(ApiVersion::Internal, &endpoint, timeout).await?;
        let observed = current.as_object().cloned().unwrap_or_default();
        if is_equivalent(&Value::Object(config.clone()), &project(config, &observed)) {
            return Ok(Outcome::no_change(format!(
                "No change required. The AWS native account '{name}' already has the requested settings."
            )));
        }

        let updated = self
            .dispatcher()
            .patch(ApiVersion::Internal, &endpoint, config, self.timeout(timeout))
            .await?
            .decode()?;
        Ok(Outcome::Applied(updated))
    }

    /// Delete an AWS native account and wait for the removal job.
    pub async fn remove_aws_account(
        &self,
        name: &str,
        delete_existing_snapshots: bool,
        timeout: Option<Duration>,
    ) -> Result<Outcome<JobReport>, CoreError> {
        let timeout = self.job_timeout(timeout);
        let account = match self.aws_account_summary(name, Some(timeout)).await {
            Ok(account) => account,
            Err(e) if e.is_not_found() => {
                return Ok(Outcome::no_change(format!(
                    "No change required. The cluster does not contain an AWS native account named '{name}'."
                )));
            }
            Err(e) => return Err(e),
        };

        let removal = self
            .dispatcher()
            .delete(
                ApiVersion::Internal,
                &format!(
                    "/aws/account/{}?delete_existing_snapshots={delete_existing_snapshots}",
                    account.id
                ),
                timeout,
            )
            .await?;
        let report = self.wait_linked(&removal, timeout).await?;
        Ok(Outcome::Applied(report))
    }

    async fn aws_accounts(&self, timeout: Option<Duration>) -> Result<Vec<AwsAccount>, CoreError> {
        let listing = self
            .get(ApiVersion::Internal, "/aws/account", timeout)
            .await?;
        data_objects(&listing)?
            .into_iter()
            .map(|a| decode(Value::Object(a.clone())))
            .collect()
    }

    async fn aws_account(
        &self,
        id: &str,
        timeout: Option<Duration>,
    ) -> Result<AwsAccount, CoreError> {
        let account = self
            .get(ApiVersion::Internal, &format!("/aws/account/{id}"), timeout)
            .await?;
        decode(account)
    }
}
