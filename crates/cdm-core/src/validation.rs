// Argument-validity tables.
//
// The cluster accepts only these values; checking them locally turns a
// confusing server error into a precise validation failure before any I/O.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

pub const AWS_REGIONS: &[&str] = &[
    "ap-south-1",
    "ap-northeast-3",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ca-central-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "us-west-1",
    "us-east-1",
    "us-east-2",
    "us-west-2",
];

pub const S3_STORAGE_CLASSES: &[&str] = &["standard", "standard_ia", "reduced_redundancy"];

pub const AZURE_REGIONS: &[&str] = &[
    "westus",
    "westus2",
    "centralus",
    "eastus",
    "eastus2",
    "northcentralus",
    "southcentralus",
    "westcentralus",
    "canadacentral",
    "canadaeast",
    "brazilsouth",
    "northeurope",
    "westeurope",
    "uksouth",
    "ukwest",
    "eastasia",
    "southeastasia",
    "japaneast",
    "japanwest",
    "australiaeast",
    "australiasoutheast",
    "centralindia",
    "southindia",
    "westindia",
    "koreacentral",
    "koreasouth",
];

pub const TIMEZONES: &[&str] = &[
    "America/Anchorage",
    "America/Araguaina",
    "America/Barbados",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Mexico_City",
    "America/New_York",
    "America/Noronha",
    "America/Phoenix",
    "America/Toronto",
    "America/Vancouver",
    "Asia/Bangkok",
    "Asia/Dhaka",
    "Asia/Dubai",
    "Asia/Hong_Kong",
    "Asia/Karachi",
    "Asia/Kathmandu",
    "Asia/Kolkata",
    "Asia/Magadan",
    "Asia/Singapore",
    "Asia/Tokyo",
    "Atlantic/Cape_Verde",
    "Australia/Perth",
    "Australia/Sydney",
    "Europe/Amsterdam",
    "Europe/Athens",
    "Europe/London",
    "Europe/Moscow",
    "Pacific/Auckland",
    "Pacific/Honolulu",
    "Pacific/Midway",
    "UTC",
];

/// Fail with a validation error unless `value` is one of `table`.
pub fn ensure_member(field: &str, value: &str, table: &[&str]) -> Result<(), CoreError> {
    if table.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "'{value}' is not a valid {field}. Valid choices are: {}",
            table.join(", ")
        )))
    }
}

/// Azure cloud the storage account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AzureInstanceType {
    #[default]
    Default,
    China,
    Germany,
    Government,
}

impl AzureInstanceType {
    /// Storage endpoint suffix; `None` for the public cloud.
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::China => Some("core.chinacloudapi.cn"),
            Self::Germany => Some("core.cloudapi.de"),
            Self::Government => Some("core.usgovcloudapi.net"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SyslogProtocol {
    Udp,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SmtpEncryption {
    None,
    Ssl,
    StartTls,
}

/// SLA selection for assignment: a named domain or one of the two
/// reserved targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaTarget {
    /// `do not protect`: exclude from every SLA assignment.
    DoNotProtect,
    /// `clear`: inherit the SLA of the parent object.
    Clear,
    Named(String),
}

impl SlaTarget {
    pub fn parse(name: &str) -> Self {
        match name {
            "do not protect" => Self::DoNotProtect,
            "clear" => Self::Clear,
            other => Self::Named(other.to_owned()),
        }
    }

    /// Reserved SLA id, if this is not a named domain.
    pub fn reserved_id(&self) -> Option<&'static str> {
        match self {
            Self::DoNotProtect => Some("UNPROTECTED"),
            Self::Clear => Some("INHERIT"),
            Self::Named(_) => None,
        }
    }
}
