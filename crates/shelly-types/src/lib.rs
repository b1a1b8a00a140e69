//! Shared types for Shelly Gen2+ device components.
//!
//! This crate provides the config/status shapes exchanged with a device over
//! JSON-RPC, plus the [`ComponentKey`] used to address a component instance.
//! Every config and status struct carries a [`RawFields`] bucket so that
//! members added by newer firmware survive a decode/encode round trip.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

mod boolean;
mod device;
mod kvs;
mod switch;
mod sys;

pub use boolean::{BooleanConfig, BooleanSetParams, BooleanStatus};
pub use device::{DeviceInfo, MethodList};
pub use kvs::{
    KvsDeleteResult, KvsEntry, KvsGetManyResult, KvsGetResult, KvsItems, KvsKeyInfo,
    KvsListResult, KvsListedEntry, KvsSetParams, KvsSetResult,
};
pub use switch::{
    EnergyCounter, InMode, InitialState, SwitchConfig, SwitchSetParams, SwitchSetResult,
    SwitchStatus, Temperature,
};
pub use sys::{SysConfig, SysDeviceConfig, SysLocation, SysSntp, SysStatus};

/// JSON members that a struct does not map to a named field.
///
/// Captured with `#[serde(flatten)]` on decode and written back beneath the
/// known fields on encode.
pub type RawFields = serde_json::Map<String, serde_json::Value>;

/// Config member that `SetConfig` can clear.
///
/// `None` leaves the member out of the payload, `Some(None)` sends `null`
/// and `Some(Some(v))` sends the value. Decoding a `null` yields `Some(None)`.
pub type Nullable<T> = Option<Option<T>>;

/// Deserializer for [`Nullable`] fields, used together with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reply to every `<Component>.SetConfig` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetConfigResult {
    #[serde(default)]
    pub restart_required: bool,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// Canonical address of a component instance: `"type"` or `"type:id"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    kind: String,
    id: Option<u32>,
}

impl ComponentKey {
    /// Key of a singleton component such as `sys` or `cloud`.
    #[must_use]
    pub fn singleton(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Key of an instanced component such as `switch:0`.
    #[must_use]
    pub fn instance(kind: impl Into<String>, id: u32) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// RPC namespace for this component (`switch` -> `Switch`, `kvs` -> `KVS`).
    #[must_use]
    pub fn method_prefix(&self) -> String {
        method_prefix_for(&self.kind)
    }
}

/// Map a component type to the namespace its RPC methods live under.
///
/// Most namespaces capitalize the first letter; a handful of acronyms are
/// fully upper-cased on the wire.
#[must_use]
pub fn method_prefix_for(kind: &str) -> String {
    match kind {
        "kvs" | "mqtt" | "ws" | "ble" | "bthome" | "ui" | "em" | "em1" | "pm1" => {
            kind.to_ascii_uppercase()
        }
        "wifi" => "WiFi".to_string(),
        "bthomedevice" => "BTHomeDevice".to_string(),
        "bthomesensor" => "BTHomeSensor".to_string(),
        "emdata" => "EMData".to_string(),
        "em1data" => "EM1Data".to_string(),
        "rgb" => "RGB".to_string(),
        "rgbw" => "RGBW".to_string(),
        _ => {
            let mut chars = kind.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}:{id}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Errors produced when parsing a [`ComponentKey`] from its string form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("Empty component key")]
    Empty,

    #[error("Invalid component type in key: {0}")]
    InvalidKind(String),

    #[error("Invalid component id in key: {0}")]
    InvalidId(String),
}

impl FromStr for ComponentKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => {
                let id = id
                    .parse::<u32>()
                    .map_err(|_| KeyParseError::InvalidId(s.to_string()))?;
                (kind, Some(id))
            }
            None => (s, None),
        };

        if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(KeyParseError::InvalidKind(s.to_string()));
        }

        Ok(Self {
            kind: kind.to_string(),
            id,
        })
    }
}

impl Serialize for ComponentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_display_instance() {
        assert_eq!(ComponentKey::instance("switch", 0).to_string(), "switch:0");
        assert_eq!(
            ComponentKey::instance("boolean", 200).to_string(),
            "boolean:200"
        );
    }

    #[test]
    fn test_key_display_singleton() {
        assert_eq!(ComponentKey::singleton("sys").to_string(), "sys");
        assert_eq!(ComponentKey::singleton("cloud").to_string(), "cloud");
    }

    #[test]
    fn test_key_parse() {
        let key: ComponentKey = "switch:1".parse().unwrap();
        assert_eq!(key.kind(), "switch");
        assert_eq!(key.id(), Some(1));

        let key: ComponentKey = "mqtt".parse().unwrap();
        assert_eq!(key.kind(), "mqtt");
        assert_eq!(key.id(), None);
    }

    #[test]
    fn test_key_parse_errors() {
        assert_eq!("".parse::<ComponentKey>(), Err(KeyParseError::Empty));
        assert!(matches!(
            "switch:abc".parse::<ComponentKey>(),
            Err(KeyParseError::InvalidId(_))
        ));
        assert!(matches!(
            ":3".parse::<ComponentKey>(),
            Err(KeyParseError::InvalidKind(_))
        ));
        assert!(matches!(
            "sw itch".parse::<ComponentKey>(),
            Err(KeyParseError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ComponentKey::instance("switch", 3);
        let b: ComponentKey = a.to_string().parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = ComponentKey::instance("input", 2);
        assert_eq!(serde_json::to_value(&key).unwrap(), json!("input:2"));

        let parsed: ComponentKey = serde_json::from_value(json!("ws")).unwrap();
        assert_eq!(parsed, ComponentKey::singleton("ws"));
    }

    #[test]
    fn test_method_prefix() {
        assert_eq!(method_prefix_for("switch"), "Switch");
        assert_eq!(method_prefix_for("boolean"), "Boolean");
        assert_eq!(method_prefix_for("sys"), "Sys");
        assert_eq!(method_prefix_for("kvs"), "KVS");
        assert_eq!(method_prefix_for("mqtt"), "MQTT");
        assert_eq!(method_prefix_for("wifi"), "WiFi");
        assert_eq!(method_prefix_for("rgbw"), "RGBW");
        assert_eq!(
            ComponentKey::instance("cover", 0).method_prefix(),
            "Cover"
        );
    }

    #[test]
    fn test_set_config_result_captures_unknown() {
        let json = json!({"restart_required": true, "applied_at": 12});
        let result: SetConfigResult = serde_json::from_value(json).unwrap();
        assert!(result.restart_required);
        assert_eq!(result.raw_fields["applied_at"], 12);
    }
}
