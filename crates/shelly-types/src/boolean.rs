//! Virtual boolean component (`boolean:<id>`, ids 200..=299).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Nullable, RawFields};

/// `Boolean.GetConfig` result and `Boolean.SetConfig` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(
        default,
        deserialize_with = "crate::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Nullable<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<bool>,
    /// Free-form UI metadata; the device attaches no schema to it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `Boolean.GetStatus` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_ts: Option<i64>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `Boolean.Set` parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanSetParams {
    pub id: u32,
    pub value: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_config_meta_is_open() {
        let json = json!({
            "id": 200,
            "name": "Away mode",
            "persisted": true,
            "meta": {"ui": {"view": "toggle", "titles": ["Home", "Away"]}}
        });
        let config: BooleanConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.id, Some(200));
        assert_eq!(config.meta.unwrap()["ui"]["view"], "toggle");
    }

    #[test]
    fn test_boolean_status_decode() {
        let json = json!({"value": true, "source": "rpc", "last_update_ts": 1_700_000_123});
        let status: BooleanStatus = serde_json::from_value(json).unwrap();
        assert!(status.value);
        assert_eq!(status.last_update_ts, Some(1_700_000_123));
    }

    #[test]
    fn test_boolean_set_params() {
        let params = BooleanSetParams { id: 200, value: true };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"id": 200, "value": true})
        );
    }
}
