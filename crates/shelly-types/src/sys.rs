//! System component (`sys`, singleton).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Nullable, RawFields};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysDeviceConfig {
    #[serde(
        default,
        deserialize_with = "crate::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Nullable<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fw_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discoverable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysSntp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

/// `Sys.GetConfig` result and `Sys.SetConfig` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<SysDeviceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SysLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sntp: Option<SysSntp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_udp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_rev: Option<u32>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `Sys.GetStatus` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default)]
    pub restart_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unixtime: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_free: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_free: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_rev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kvs_rev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_rev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_rev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_updates: Option<Value>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sys_config_nested_unknowns() {
        let json = json!({
            "device": {"name": "Garage", "mac": "A8032ABE54DC", "addon_type": null},
            "location": {"tz": "Europe/Sofia", "lat": 42.67, "lon": 23.31},
            "cfg_rev": 10,
            "wakeup_period": 0
        });
        let config: SysConfig = serde_json::from_value(json).unwrap();

        let device = config.device.as_ref().unwrap();
        assert_eq!(device.name, Some(Some("Garage".to_string())));
        assert!(device.raw_fields.contains_key("addon_type"));
        assert_eq!(config.cfg_rev, Some(10));
        assert_eq!(config.raw_fields["wakeup_period"], 0);
    }

    #[test]
    fn test_sys_status_decode() {
        let json = json!({
            "mac": "A8032ABE54DC",
            "restart_required": false,
            "time": "16:06",
            "unixtime": 1_650_035_219,
            "uptime": 11081,
            "ram_size": 254_744,
            "ram_free": 151_560,
            "kvs_rev": 2,
            "available_updates": {"stable": {"version": "1.4.4"}}
        });
        let status: SysStatus = serde_json::from_value(json).unwrap();

        assert_eq!(status.uptime, Some(11081));
        assert_eq!(status.kvs_rev, Some(2));
        assert_eq!(
            status.available_updates.unwrap()["stable"]["version"],
            "1.4.4"
        );
    }
}
