//! Device-level (`Shelly.*`) shapes.

use serde::{Deserialize, Serialize};

use crate::RawFields;

/// `Shelly.GetDeviceInfo` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub id: String,
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    pub model: String,
    #[serde(rename = "gen")]
    pub generation: u32,
    pub fw_id: String,
    pub ver: String,
    pub app: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub auth_en: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `Shelly.ListMethods` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodList {
    #[serde(default)]
    pub methods: Vec<String>,
}
