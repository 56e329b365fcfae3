//! Shared configuration for CDM clients.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `cdm_core::ClientConfig`. Scripts that only carry
//! the three `rubrik_cdm_*` environment variables use
//! [`credentials_from_env`] instead of a profile.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cdm_api::StripFields;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use cdm_core::{ClientConfig, Credentials, ResourceKind, StripRules, TlsMode};

/// Keyring service holding profile passwords.
pub const KEYRING_SERVICE: &str = "cdm";

pub const ENV_NODE_IP: &str = "rubrik_cdm_node_ip";
pub const ENV_USERNAME: &str = "rubrik_cdm_username";
pub const ENV_PASSWORD: &str = "rubrik_cdm_password";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' is not defined")]
    UnknownProfile { profile: String },

    #[error("the '{var}' environment variable is not set")]
    MissingEnv { var: &'static str },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named cluster profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Strip-list overrides keyed by resource kind (`s3_archive`, `smtp`, ...).
    #[serde(default)]
    pub reconcile: BTreeMap<String, ReconcileRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            reconcile: BTreeMap::new(),
        }
    }
}

/// Timing and TLS defaults shared by every profile. Durations in seconds.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Skip certificate validation (clusters ship self-signed certificates).
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_job_timeout")]
    pub job_timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Overall bound on a job wait; unset waits indefinitely.
    #[serde(default)]
    pub poll_deadline: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: default_insecure(),
            timeout: default_timeout(),
            job_timeout: default_job_timeout(),
            poll_interval: default_poll_interval(),
            poll_deadline: None,
        }
    }
}

fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    15
}
fn default_job_timeout() -> u64 {
    180
}
fn default_poll_interval() -> u64 {
    10
}

/// A named cluster profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Node IP or hostname of the cluster.
    pub node_ip: String,

    /// Username; leave unset for anonymous bootstrap access.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate. Enables validation.
    pub ca_cert: Option<PathBuf>,

    /// Override the default TLS setting.
    pub insecure: Option<bool>,

    /// Override timeouts and poll interval (seconds).
    pub timeout: Option<u64>,
    pub job_timeout: Option<u64>,
    pub poll_interval: Option<u64>,
    pub poll_deadline: Option<u64>,
}

/// `[reconcile.<resource>]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileRule {
    /// Server-only fields removed before comparing definitions.
    pub strip: Vec<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "cdm", "cdm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cdm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + `CDM_`-prefixed environment variables.
///
/// Nested keys use a double underscore: `CDM_DEFAULTS__TIMEOUT=30`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CDM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults when it cannot be read.
///
/// A missing file already yields defaults; a malformed file or environment
/// override is logged before the fallback.
pub fn load_config_or_default() -> Config {
    load_config_or_default_from(&config_path())
}

/// [`load_config_or_default`] for an explicit path.
pub fn load_config_or_default_from(path: &Path) -> Config {
    load_config_from(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "falling back to default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Credentials from `rubrik_cdm_node_ip`, `rubrik_cdm_username` and
/// `rubrik_cdm_password`.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let read = |var: &'static str| std::env::var(var).map_err(|_| ConfigError::MissingEnv { var });
    let node_ip = read(ENV_NODE_IP)?;
    let username = read(ENV_USERNAME)?;
    let password = read(ENV_PASSWORD)?;
    Ok(Credentials::new(node_ip, username, SecretString::from(password)))
}

/// Resolve a profile's password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(secret) = entry.get_password() {
            debug!(profile = profile_name, "password taken from keyring");
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Credentials for a profile; anonymous when no username is set.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    if profile.node_ip.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "node_ip".into(),
            reason: format!("profile '{profile_name}' has no node_ip"),
        });
    }

    match profile.username.as_deref() {
        None | Some("") => Ok(Credentials::anonymous(profile.node_ip.clone())),
        Some(username) => {
            let password = resolve_password(profile, profile_name)?;
            Ok(Credentials::new(profile.node_ip.clone(), username, password))
        }
    }
}

// ── ClientConfig construction ───────────────────────────────────────

/// The profile name to use: `requested`, else the configured default.
pub fn active_profile<'a>(
    config: &'a Config,
    requested: Option<&'a str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let name = requested
        .or(config.default_profile.as_deref())
        .unwrap_or("default");
    config
        .profiles
        .get_key_value(name)
        .map(|(k, p)| (k.as_str(), p))
        .ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
}

/// Strip rules with the `[reconcile.*]` overrides applied.
pub fn strip_rules(config: &Config) -> Result<StripRules, ConfigError> {
    let mut rules = StripRules::default();
    for (key, rule) in &config.reconcile {
        let kind: ResourceKind = key.parse().map_err(|_| ConfigError::Validation {
            field: format!("reconcile.{key}"),
            reason: "unknown resource kind".into(),
        })?;
        rules.set(kind, StripFields::new(rule.strip.iter().cloned()));
    }
    Ok(rules)
}

/// Build a `ClientConfig` from a profile plus the global defaults.
pub fn profile_to_client_config(
    config: &Config,
    profile_name: &str,
) -> Result<ClientConfig, ConfigError> {
    let profile = config
        .profiles
        .get(profile_name)
        .ok_or_else(|| ConfigError::UnknownProfile {
            profile: profile_name.into(),
        })?;
    let defaults = &config.defaults;

    let credentials = resolve_credentials(profile, profile_name)?;

    let tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else {
        TlsMode::System
    };

    let mut client = ClientConfig::new(credentials);
    client.tls = tls;
    client.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    client.job_timeout = Duration::from_secs(profile.job_timeout.unwrap_or(defaults.job_timeout));
    client.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    client.poll_deadline = profile
        .poll_deadline
        .or(defaults.poll_deadline)
        .map(Duration::from_secs);
    client.strip = strip_rules(config)?;
    Ok(client)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cluster_conventions() {
        let d = Defaults::default();
        assert!(d.insecure);
        assert_eq!(d.timeout, 15);
        assert_eq!(d.job_timeout, 180);
        assert_eq!(d.poll_interval, 10);
        assert!(d.poll_deadline.is_none());
    }

    #[test]
    fn anonymous_profile_needs_no_password() {
        let profile = Profile {
            node_ip: "10.0.0.1".into(),
            ..Profile::default()
        };
        let creds = resolve_credentials(&profile, "bootstrap").unwrap();
        assert!(creds.is_anonymous());
    }

    #[test]
    fn missing_node_ip_is_rejected() {
        let err = resolve_credentials(&Profile::default(), "empty").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "node_ip"));
    }

    #[test]
    fn unknown_reconcile_kind_is_rejected() {
        let mut config = Config::default();
        config.reconcile.insert(
            "tape_archive".into(),
            ReconcileRule {
                strip: vec!["id".into()],
            },
        );
        let err = strip_rules(&config).unwrap_err();
        assert!(err.to_string().contains("reconcile.tape_archive"));
    }

    #[test]
    fn ca_cert_takes_precedence_over_insecure() {
        let mut config = Config::default();
        config.profiles.insert(
            "lab".into(),
            Profile {
                node_ip: "10.0.0.1".into(),
                ca_cert: Some(PathBuf::from("/etc/cdm/ca.pem")),
                insecure: Some(true),
                ..Profile::default()
            },
        );
        let client = profile_to_client_config(&config, "lab").unwrap();
        assert!(matches!(client.tls, TlsMode::CustomCa(_)));
    }
}
