use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

/// Credentials for a CDM cluster.
///
/// Immutable once built and shared read-only by every call issued through a
/// [`Dispatcher`](crate::Dispatcher). An empty username selects anonymous
/// mode: no `Authorization` header is sent (used while bootstrapping a
/// fresh node).
#[derive(Clone)]
pub struct Credentials {
    host: String,
    username: String,
    password: Arc<SecretString>,
}

impl Credentials {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: Arc::new(password),
        }
    }

    /// Anonymous credentials for bootstrap calls.
    pub fn anonymous(host: impl Into<String>) -> Self {
        Self::new(host, "", SecretString::from(String::new()))
    }

    /// Node IP or hostname of the cluster.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// `true` when no username is configured.
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// `true` when the password is empty.
    pub fn has_empty_password(&self) -> bool {
        self.password.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
