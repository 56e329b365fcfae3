// Server-only fields per reconciled resource.
//
// Before comparing a desired definition with what the cluster reports, the
// fields the cluster adds on its own (ids, computed flags, nested summaries)
// are removed from the observed side. The lists are configuration so that a
// newer CDM release adding a field does not turn every call into a write.

use std::collections::HashMap;

use cdm_api::StripFields;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Resources whose definitions are reconciled structurally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    S3Archive,
    AzureArchive,
    Syslog,
    Smtp,
    Vlan,
}

impl ResourceKind {
    fn default_fields(self) -> StripFields {
        match self {
            Self::S3Archive => StripFields::new([
                "id",
                "isComputeEnabled",
                "isConsolidationEnabled",
                "pemFileContent",
                "kmsMasterKeyId",
                "endpoint",
                "numBuckets",
                "defaultComputeNetworkConfig",
                "azureComputeSummary",
            ]),
            Self::AzureArchive => StripFields::new([
                "id",
                "defaultComputeNetworkConfig",
                "isComputeEnabled",
                "isConsolidationEnabled",
                "azureComputeSummary",
            ]),
            Self::Syslog | Self::Smtp => StripFields::new(["id"]),
            Self::Vlan => StripFields::default(),
        }
    }
}

/// Strip lists keyed by resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripRules {
    rules: HashMap<ResourceKind, StripFields>,
}

impl Default for StripRules {
    fn default() -> Self {
        Self {
            rules: ResourceKind::iter()
                .map(|kind| (kind, kind.default_fields()))
                .collect(),
        }
    }
}

impl StripRules {
    pub fn get(&self, kind: ResourceKind) -> StripFields {
        self.rules
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.default_fields())
    }

    /// Replace the list for one resource kind.
    pub fn set(&mut self, kind: ResourceKind, fields: StripFields) {
        self.rules.insert(kind, fields);
    }

    #[must_use]
    pub fn with(mut self, kind: ResourceKind, fields: StripFields) -> Self {
        self.set(kind, fields);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let rules = StripRules::default();
        assert!(rules.get(ResourceKind::S3Archive).fields().contains(&"isComputeEnabled".to_owned()));
        assert!(rules.get(ResourceKind::Vlan).fields().is_empty());
    }

    #[test]
    fn override_replaces_list() {
        let rules = StripRules::default().with(ResourceKind::Smtp, StripFields::new(["id", "smtpPassword"]));
        assert_eq!(rules.get(ResourceKind::Smtp).fields().len(), 2);
    }

    #[test]
    fn kind_names() {
        assert_eq!("s3_archive".parse::<ResourceKind>().ok(), Some(ResourceKind::S3Archive));
        assert_eq!(ResourceKind::AzureArchive.to_string(), "azure_archive");
    }
}
