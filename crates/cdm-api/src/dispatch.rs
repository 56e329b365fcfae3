// Request dispatcher
//
// Wraps `reqwest::Client` with CDM URL construction, basic auth, and
// response classification. One call is exactly one round trip; nothing is
// retried here.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use tracing::{debug, trace};
use url::Url;

use crate::classify::{DispatchResult, classify, classify_job_status};
use crate::credentials::Credentials;
use crate::endpoint::{ApiVersion, validate_endpoint};
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::url_codec;

/// HTTP methods used by the CDM API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Async dispatcher for one CDM cluster.
///
/// Holds the immutable credentials and a pooled `reqwest::Client`; cheap to
/// clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl Dispatcher {
    /// Build a dispatcher targeting `https://{host}`.
    pub fn new(credentials: Credentials, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("https://{}", credentials.host()))?;
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Build a dispatcher around a pre-built client and explicit base URL.
    ///
    /// Use this to point at a proxy or a local test server.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/{version}{endpoint}`, after validating the endpoint.
    pub fn api_url(&self, version: ApiVersion, endpoint: &str) -> Result<String, Error> {
        validate_endpoint(endpoint)?;
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(format!("{base}/api/{version}{endpoint}"))
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Issue one request and classify the response.
    ///
    /// GET URLs are percent-encoded; POST/PATCH send `body` as JSON (an
    /// empty object when `None`); DELETE sends no body.
    pub async fn execute(
        &self,
        method: Method,
        version: ApiVersion,
        endpoint: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        let url = self.api_url(version, endpoint)?;
        let url = match method {
            Method::Get => url_codec::escape(&url),
            Method::Post | Method::Patch | Method::Delete => url,
        };
        debug!("{method} {url}");

        let mut builder = self.request(method.into(), &url, timeout);
        match method {
            Method::Post | Method::Patch => {
                let empty = Value::Object(serde_json::Map::new());
                builder = builder.json(body.unwrap_or(&empty));
            }
            Method::Get | Method::Delete => {}
        }

        self.send(builder).await
    }

    /// GET an absolute URL as-is (job-status links returned by the cluster).
    pub async fn get_url(&self, url: &str, timeout: Duration) -> Result<DispatchResult, Error> {
        debug!("GET {url}");
        let builder = self.request(reqwest::Method::GET, url, timeout);
        self.send(builder).await
    }

    /// GET a job-status document. A `message` next to `status` is payload,
    /// not a domain error; see [`classify_job_status`].
    pub async fn get_job_status(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        debug!("GET {url}");
        let builder = self.request(reqwest::Method::GET, url, timeout);
        self.send_with(builder, classify_job_status).await
    }

    pub async fn get(
        &self,
        version: ApiVersion,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        self.execute(Method::Get, version, endpoint, None, timeout)
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        version: ApiVersion,
        endpoint: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        let body = to_body(body)?;
        self.execute(Method::Post, version, endpoint, Some(&body), timeout)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        version: ApiVersion,
        endpoint: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        let body = to_body(body)?;
        self.execute(Method::Patch, version, endpoint, Some(&body), timeout)
            .await
    }

    pub async fn delete(
        &self,
        version: ApiVersion,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<DispatchResult, Error> {
        self.execute(Method::Delete, version, endpoint, None, timeout)
            .await
    }

    // ── Response handling ────────────────────────────────────────────

    /// Request builder with JSON headers, the per-call timeout, and basic
    /// auth unless the credentials are anonymous.
    fn request(&self, method: reqwest::Method, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json");
        if self.credentials.is_anonymous() {
            builder
        } else {
            builder.basic_auth(
                self.credentials.username(),
                Some(self.credentials.password().expose_secret()),
            )
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<DispatchResult, Error> {
        self.send_with(builder, classify).await
    }

    async fn send_with(
        &self,
        builder: reqwest::RequestBuilder,
        classifier: fn(&str, StatusCode) -> Result<DispatchResult, Error>,
    ) -> Result<DispatchResult, Error> {
        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        trace!(%status, "response received");

        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        classifier(&body, status)
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() || err.is_connect() {
            debug!(error = %err, "cluster unreachable");
            Error::Unreachable {
                host: self.credentials.host().to_owned(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, Error> {
    serde_json::to_value(body).map_err(|e| Error::Deserialization {
        message: format!("failed to serialize request body: {e}"),
        body: String::new(),
    })
}
