//! The device's key-value store (`KVS.*`).

use std::sync::Arc;

use serde_json::{Map, Value, json};
use shelly_types::{
    ComponentKey, KvsDeleteResult, KvsGetManyResult, KvsGetResult, KvsListResult, KvsSetParams,
    KvsSetResult,
};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{Component, request_with_id, to_params};

#[derive(Debug, Clone)]
pub struct Kvs {
    client: Arc<RpcClient>,
    key: ComponentKey,
}

fn match_params(pattern: Option<&str>) -> Option<Value> {
    pattern.map(|pattern| json!({ "match": pattern }))
}

impl Kvs {
    #[must_use]
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            key: ComponentKey::singleton("kvs"),
        }
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `KVS.Get`; a missing key is
    /// a protocol error.
    pub async fn get(&self, ctx: &CallContext, key: &str) -> Result<KvsGetResult> {
        request_with_id(ctx, self, "Get", Some(json!({ "key": key }))).await
    }

    /// Entries whose key matches `pattern` (`*` wildcards), or all entries.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `KVS.GetMany`.
    pub async fn get_many(
        &self,
        ctx: &CallContext,
        pattern: Option<&str>,
    ) -> Result<KvsGetManyResult> {
        request_with_id(ctx, self, "GetMany", match_params(pattern)).await
    }

    /// Keys and etags matching `pattern`, or all keys.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `KVS.List`.
    pub async fn list(&self, ctx: &CallContext, pattern: Option<&str>) -> Result<KvsListResult> {
        request_with_id(ctx, self, "List", match_params(pattern)).await
    }

    /// Store `value` under `key`. With `etag`, only overwrite an entry that
    /// still carries it.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `KVS.Set`.
    pub async fn set(
        &self,
        ctx: &CallContext,
        key: &str,
        value: Value,
        etag: Option<&str>,
    ) -> Result<KvsSetResult> {
        let params = KvsSetParams {
            key: key.to_string(),
            value,
            etag: etag.map(str::to_string),
        };
        let params = to_params("KVS.Set", &params)?;
        request_with_id(ctx, self, "Set", Some(params)).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `KVS.Delete`.
    pub async fn delete(
        &self,
        ctx: &CallContext,
        key: &str,
        etag: Option<&str>,
    ) -> Result<KvsDeleteResult> {
        let mut params = Map::new();
        params.insert("key".to_string(), Value::from(key));
        if let Some(etag) = etag {
            params.insert("etag".to_string(), Value::from(etag));
        }
        request_with_id(ctx, self, "Delete", Some(Value::Object(params))).await
    }
}

impl Component for Kvs {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
