// Endpoint targets: API version tag + path.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::Error;

/// API surface selected by the `/api/{version}` path segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    V2,
    Internal,
}

impl ApiVersion {
    /// Parse a version tag, failing with [`Error::InvalidApiVersion`].
    pub fn parse(tag: &str) -> Result<Self, Error> {
        tag.parse()
            .map_err(|_| Error::InvalidApiVersion(tag.to_owned()))
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Check that `endpoint` starts with `/` and does not end with `/`.
pub fn validate_endpoint(endpoint: &str) -> Result<(), Error> {
    if !endpoint.starts_with('/') {
        return Err(Error::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: "the endpoint should begin with '/' (ex: /cluster/me)",
        });
    }
    if endpoint.ends_with('/') {
        return Err(Error::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: "the endpoint should not end with '/' (ex: /cluster/me)",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_round_trip_through_their_tags() {
        assert_eq!(ApiVersion::parse("v1").ok(), Some(ApiVersion::V1));
        assert_eq!(ApiVersion::parse("v2").ok(), Some(ApiVersion::V2));
        assert_eq!(ApiVersion::parse("internal").ok(), Some(ApiVersion::Internal));
        assert_eq!(ApiVersion::Internal.to_string(), "internal");
        assert_eq!(ApiVersion::V2.as_str(), "v2");
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(matches!(
            ApiVersion::parse("v3"),
            Err(Error::InvalidApiVersion(tag)) if tag == "v3"
        ));
        assert!(ApiVersion::parse("V1").is_err());
    }

    #[test]
    fn endpoint_rules() {
        assert!(validate_endpoint("/cluster/me").is_ok());
        assert!(validate_endpoint("/vmware/vm?name=a").is_ok());
        assert!(validate_endpoint("cluster/me").is_err());
        assert!(validate_endpoint("/cluster/me/").is_err());
        assert!(validate_endpoint("/").is_err());
        assert!(validate_endpoint("").is_err());
    }
}
