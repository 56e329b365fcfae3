//! Idempotent cluster operations on top of `cdm-api`.
//!
//! - **[`Cdm`]**: the client facade. Owns one [`cdm_api::Dispatcher`] and the
//!   [`ClientConfig`]; every operation is an async method on it.
//!
//! - **Operations**: grouped by area in [`cluster`], [`cloud`] and
//!   [`data_management`]. Mutating operations read the current remote state
//!   first and return [`Outcome::NoChange`] when it already matches.
//!
//! - **Reconciliation rules** ([`strip`]): per-resource lists of
//!   server-only fields removed before comparing definitions.
//!
//! - **Argument tables** ([`validation`]): accepted regions, storage
//!   classes, timezones and protocol names, checked before any I/O.

pub mod client;
pub mod cloud;
pub mod cluster;
pub mod config;
pub mod data_management;
pub mod error;
pub mod model;
pub mod outcome;
pub mod requests;
pub mod strip;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::Cdm;
pub use config::ClientConfig;
pub use error::CoreError;
pub use outcome::Outcome;
pub use strip::{ResourceKind, StripRules};

pub use model::{
    ArchiveLocation, AwsAccount, BoltNetworkConfig, ClusterProperties, Geolocation, ObjectStore,
    SmtpInstance, SyslogServer, Timezone,
};
pub use requests::{
    AwsNativeAccountRequest, AzureArchiveRequest, AzureCloudOnRequest, BootstrapRequest,
    S3ArchiveRequest, S3Encryption, SmtpSettings, VcenterRequest,
};
pub use validation::{AzureInstanceType, SlaTarget, SmtpEncryption, SyslogProtocol};

// The transport types callers need alongside the client.
pub use cdm_api::{ApiVersion, Credentials, HostOs, JobHandle, JobReport, JobStatus, ObjectType, TlsMode};
