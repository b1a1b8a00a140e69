//! Device-wide `Shelly.*` methods.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use shelly_types::{ComponentKey, DeviceInfo, MethodList};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{Component, call_with_id, request_with_id};

/// The device itself.
#[derive(Debug, Clone)]
pub struct Shelly {
    client: Arc<RpcClient>,
    key: ComponentKey,
}

impl Shelly {
    #[must_use]
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            key: ComponentKey::singleton("shelly"),
        }
    }

    /// Model, firmware and identity. With `ident`, also the fields only
    /// meant for device identification.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Shelly.GetDeviceInfo`.
    pub async fn get_device_info(&self, ctx: &CallContext, ident: bool) -> Result<DeviceInfo> {
        let params = ident.then(|| json!({ "ident": true }));
        request_with_id(ctx, self, "GetDeviceInfo", params).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Shelly.ListMethods`.
    pub async fn list_methods(&self, ctx: &CallContext) -> Result<MethodList> {
        request_with_id(ctx, self, "ListMethods", None).await
    }

    /// Status of every component, keyed by component key.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Shelly.GetStatus`.
    pub async fn get_status(&self, ctx: &CallContext) -> Result<Map<String, Value>> {
        request_with_id(ctx, self, "GetStatus", None).await
    }

    /// Config of every component, keyed by component key.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Shelly.GetConfig`.
    pub async fn get_config(&self, ctx: &CallContext) -> Result<Map<String, Value>> {
        request_with_id(ctx, self, "GetConfig", None).await
    }

    /// # Errors
    ///
    /// Transport or protocol errors from `Shelly.Reboot`.
    pub async fn reboot(&self, ctx: &CallContext, delay_ms: Option<u64>) -> Result<()> {
        let params = delay_ms.map(|delay_ms| json!({ "delay_ms": delay_ms }));
        call_with_id(ctx, self, "Reboot", params).await?;
        Ok(())
    }
}

impl Component for Shelly {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
