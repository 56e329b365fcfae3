// ── Runtime connection configuration ──
//
// These types describe *how* to talk to a CDM cluster. They carry
// credential data and timing knobs, but never touch disk; `cdm-config`
// builds a `ClientConfig` from profiles and hands it in.

use std::time::Duration;

use cdm_api::transport::{DEFAULT_TIMEOUT, JOB_TIMEOUT};
use cdm_api::{Credentials, TlsMode, TransportConfig};

use crate::strip::StripRules;

/// Default timeout for cluster registration.
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(160);

/// Configuration for one cluster connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub tls: TlsMode,
    /// Per-request timeout when an operation is given none.
    pub timeout: Duration,
    /// Per-request timeout for operations that wait on jobs.
    pub job_timeout: Duration,
    pub register_timeout: Duration,
    /// Sleep between job-status polls.
    pub poll_interval: Duration,
    /// Overall bound on a single job wait. `None` waits indefinitely.
    pub poll_deadline: Option<Duration>,
    /// Sleep between bootstrap progress polls.
    pub bootstrap_poll_interval: Duration,
    /// Attempts of the bootstrap-status check while the node is unreachable.
    pub bootstrap_check_attempts: u32,
    pub bootstrap_check_interval: Duration,
    pub strip: StripRules,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            tls: TlsMode::DangerAcceptInvalid,
            timeout: DEFAULT_TIMEOUT,
            job_timeout: JOB_TIMEOUT,
            register_timeout: REGISTER_TIMEOUT,
            poll_interval: cdm_api::job::DEFAULT_POLL_INTERVAL,
            poll_deadline: None,
            bootstrap_poll_interval: Duration::from_secs(30),
            bootstrap_check_attempts: 24,
            bootstrap_check_interval: Duration::from_secs(10),
            strip: StripRules::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
