use thiserror::Error;

/// Top-level error type for the `cdm-api` crate.
///
/// Covers every failure mode of the dispatch layer: argument validation,
/// transport, response decoding, domain errors reported by the cluster,
/// object resolution, and job polling. `cdm-core` wraps these into its own
/// operation-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Validation ──────────────────────────────────────────────────
    /// API version tag outside `v1`, `v2`, `internal`.
    #[error("Enter a valid API version (v1, v2 or internal), got '{0}'")]
    InvalidApiVersion(String),

    /// Endpoint path does not start with `/` or ends with `/`.
    #[error("Invalid API endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: &'static str },

    /// Enumerated argument outside its accepted set.
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Connect failure or timeout: the cluster did not answer in time.
    #[error("Unable to establish a connection to the cluster at {host}")]
    Unreachable { host: String },

    /// HTTP transport error other than connect/timeout.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Body was not JSON and the status was not a success; carries the
    /// HTTP status line (e.g. `404 Not Found`).
    #[error("{status}")]
    Decode { status: String },

    /// JSON decoded but did not fit the requested typed shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A response lacked a field (or held it with the wrong JSON type).
    #[error("Response field '{field}' is missing or is not {expected}")]
    MissingField {
        field: String,
        expected: &'static str,
    },

    // ── Domain ──────────────────────────────────────────────────────
    /// Error message reported by the cluster (`errorType` / `message`).
    #[error("{message}")]
    Api { message: String },

    // ── Object resolution ───────────────────────────────────────────
    #[error("The {object_type} object '{name}' was not found on the cluster")]
    ObjectNotFound { object_type: String, name: String },

    #[error(
        "Multiple {object_type} objects named '{name}' were found on the cluster. Unable to return a specific object id"
    )]
    AmbiguousObject { object_type: String, name: String },

    // ── Jobs ────────────────────────────────────────────────────────
    /// Job reached `FAILED` / `FAILURE`.
    #[error("Job failed: {message}")]
    JobFailed { message: String },

    /// Polling was cancelled through its cancellation token.
    #[error("Job polling cancelled")]
    Cancelled,

    /// Polling ran past its overall deadline.
    #[error("Job did not reach a terminal state within {deadline_secs}s")]
    DeadlineExceeded { deadline_secs: u64 },
}

impl Error {
    /// Returns `true` for caller errors detected before any network I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidApiVersion(_) | Self::InvalidEndpoint { .. } | Self::InvalidArgument { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying by the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if this is an object-resolution "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    /// The server-supplied message for domain errors.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(Error::InvalidApiVersion("v9".into()).is_validation());
        assert!(
            Error::InvalidEndpoint {
                endpoint: "cluster/me".into(),
                reason: "must begin with '/'",
            }
            .is_validation()
        );
        assert!(!Error::Api { message: "boom".into() }.is_validation());
    }

    #[test]
    fn unreachable_is_transient() {
        let err = Error::Unreachable { host: "10.0.0.1".into() };
        assert!(err.is_transient());
        assert!(!Error::Cancelled.is_transient());
    }

    #[test]
    fn domain_message_is_verbatim() {
        let err = Error::Api { message: "boom".into() };
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.api_message(), Some("boom"));
    }
}
