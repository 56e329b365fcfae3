// ── Cluster client facade ──
//
// `Cdm` owns one `Dispatcher` and the connection configuration. Every
// operation module (`cluster`, `cloud`, `data_management`) adds methods to
// it. Calls are awaited one after another; nothing is cached between calls.

use std::time::Duration;

use cdm_api::{
    ApiVersion, DispatchResult, Dispatcher, HostOs, JobHandle, JobPoller, JobReport,
    ObjectResolver, ObjectType, ValueExt,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::CoreError;

/// Async client for one CDM cluster.
#[derive(Debug, Clone)]
pub struct Cdm {
    dispatcher: Dispatcher,
    config: ClientConfig,
    cancel: Option<CancellationToken>,
}

impl Cdm {
    /// Build a client for `https://{host}` from `config`.
    pub fn connect(config: ClientConfig) -> Result<Self, CoreError> {
        let dispatcher = Dispatcher::new(config.credentials.clone(), &config.transport())?;
        Ok(Self::with_dispatcher(dispatcher, config))
    }

    /// Build a client around an existing dispatcher (proxy, test server).
    pub fn with_dispatcher(dispatcher: Dispatcher, config: ClientConfig) -> Self {
        Self {
            dispatcher,
            config,
            cancel: None,
        }
    }

    /// Cancel any job wait of this client when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Generic passthroughs ─────────────────────────────────────────

    pub async fn get(
        &self,
        version: ApiVersion,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, CoreError> {
        Ok(self
            .dispatcher
            .get(version, endpoint, self.timeout(timeout))
            .await?
            .into_value())
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        version: ApiVersion,
        endpoint: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<Value, CoreError> {
        Ok(self
            .dispatcher
            .post(version, endpoint, body, self.timeout(timeout))
            .await?
            .into_value())
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        version: ApiVersion,
        endpoint: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<Value, CoreError> {
        Ok(self
            .dispatcher
            .patch(version, endpoint, body, self.timeout(timeout))
            .await?
            .into_value())
    }

    pub async fn delete(
        &self,
        version: ApiVersion,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, CoreError> {
        Ok(self
            .dispatcher
            .delete(version, endpoint, self.timeout(timeout))
            .await?
            .into_value())
    }

    /// Wait for the job behind `url` to finish.
    pub async fn job_status(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<JobReport, CoreError> {
        self.wait(&JobHandle::new(url), self.timeout(timeout)).await
    }

    /// Id of the object named `name`.
    pub async fn object_id(
        &self,
        name: &str,
        object_type: ObjectType,
        host_os: Option<HostOs>,
        timeout: Option<Duration>,
    ) -> Result<String, CoreError> {
        self.resolve(object_type, name, host_os, self.timeout(timeout))
            .await
    }

    // ── Shared plumbing for the operation modules ────────────────────

    pub(crate) fn timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.timeout)
    }

    pub(crate) fn job_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.job_timeout)
    }

    pub(crate) async fn resolve(
        &self,
        object_type: ObjectType,
        name: &str,
        host_os: Option<HostOs>,
        timeout: Duration,
    ) -> Result<String, CoreError> {
        let resolver = ObjectResolver::new(self.dispatcher.clone(), timeout);
        Ok(resolver.resolve(object_type, name, host_os).await?)
    }

    pub(crate) async fn wait(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> Result<JobReport, CoreError> {
        let mut poller = JobPoller::new(self.dispatcher.clone())
            .with_interval(self.config.poll_interval)
            .with_deadline(self.config.poll_deadline);
        if let Some(token) = &self.cancel {
            poller = poller.with_cancellation(token.clone());
        }
        Ok(poller.await_completion(handle, timeout).await?)
    }

    /// Wait for the job linked from a mutating response.
    pub(crate) async fn wait_linked(
        &self,
        response: &DispatchResult,
        timeout: Duration,
    ) -> Result<JobReport, CoreError> {
        let handle = JobHandle::from_response(response)?;
        self.wait(&handle, timeout).await
    }

    /// Sleep unless this client's cancellation token fires first.
    pub(crate) async fn pause(&self, interval: Duration) -> Result<(), CoreError> {
        match &self.cancel {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(cdm_api::Error::Cancelled.into()),
                () = tokio::time::sleep(interval) => Ok(()),
            },
            None => {
                tokio::time::sleep(interval).await;
                Ok(())
            }
        }
    }
}

/// Observed values for exactly the keys of `desired`.
///
/// Partial updates only name the fields they change; comparing against the
/// same projection of the current definition decides whether a PATCH is
/// needed. Absent keys project to `null`.
pub(crate) fn project(desired: &Map<String, Value>, observed: &Map<String, Value>) -> Value {
    Value::Object(
        desired
            .keys()
            .map(|k| (k.clone(), observed.get(k).cloned().unwrap_or(Value::Null)))
            .collect(),
    )
}

/// Decode a dynamic document into a typed shape.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, CoreError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        cdm_api::Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        }
        .into()
    })
}

/// `data` entries of a paged listing as objects, skipping anything else.
pub(crate) fn data_objects(listing: &Value) -> Result<Vec<&Map<String, Value>>, CoreError> {
    Ok(listing.data()?.iter().filter_map(Value::as_object).collect())
}
