// ── Core error types ──
//
// Operation-level errors from cdm-core. Dispatch failures from cdm-api pass
// through unchanged in `CoreError::Api`; everything else is a decision the
// operation itself made before or after talking to the cluster.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An argument is outside its accepted set; raised before any I/O.
    #[error("{message}")]
    Validation { message: String },

    /// A different resource already holds the requested name.
    #[error("{message}")]
    Conflict { message: String },

    /// A named resource the operation depends on does not exist.
    #[error("The cluster does not contain a {entity_type} named '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// The cluster runs an older CDM release than the operation requires.
    #[error("The cluster must be running CDM version {required} or later (found {actual})")]
    UnsupportedVersion { required: String, actual: String },

    #[error(transparent)]
    Api(#[from] cdm_api::Error),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity_type: &str, identifier: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_owned(),
            identifier: identifier.to_owned(),
        }
    }

    /// `true` for caller mistakes detected before the cluster was contacted.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Api(e) => e.is_validation(),
            _ => false,
        }
    }

    /// `true` when a looked-up resource or object is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api(e) => e.is_not_found(),
            _ => false,
        }
    }
}
