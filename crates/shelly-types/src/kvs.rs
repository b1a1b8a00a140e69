//! Key-value store (`kvs`, singleton).
//!
//! The store lives on the device; these are only the request and reply
//! shapes of the `KVS.*` methods.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::RawFields;

/// `KVS.Get` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsGetResult {
    pub etag: String,
    pub value: Value,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `KVS.Set` parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsSetParams {
    pub key: String,
    pub value: Value,
    /// Only overwrite when the stored etag still matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// `KVS.Set` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsSetResult {
    pub etag: String,
    pub rev: u64,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `KVS.Delete` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsDeleteResult {
    pub rev: u64,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsEntry {
    pub etag: String,
    #[serde(default)]
    pub value: Value,
}

/// Entry of the list-shaped `KVS.GetMany` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsListedEntry {
    pub key: String,
    pub etag: String,
    #[serde(default)]
    pub value: Value,
}

/// `KVS.GetMany` items.
///
/// Older firmware replies with an object keyed by entry name, newer firmware
/// with a paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvsItems {
    Map(BTreeMap<String, KvsEntry>),
    List(Vec<KvsListedEntry>),
}

impl Default for KvsItems {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl KvsItems {
    /// Flatten either shape into `(key, entry)` pairs.
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, KvsEntry)> {
        match self {
            Self::Map(map) => map.into_iter().collect(),
            Self::List(list) => list
                .into_iter()
                .map(|item| {
                    (
                        item.key,
                        KvsEntry {
                            etag: item.etag,
                            value: item.value,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// `KVS.GetMany` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvsGetManyResult {
    #[serde(default)]
    pub items: KvsItems,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvsKeyInfo {
    pub etag: String,
}

/// `KVS.List` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvsListResult {
    #[serde(default)]
    pub keys: BTreeMap<String, KvsKeyInfo>,
    #[serde(default)]
    pub rev: u64,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}
