//! Virtual `boolean:<id>` components.

use std::sync::Arc;

use shelly_types::{BooleanConfig, BooleanSetParams, BooleanStatus, ComponentKey, SetConfigResult};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{
    Component, call_with_id, set_config_with_id, to_params, unmarshal_config, unmarshal_status,
};

#[derive(Debug, Clone)]
pub struct Boolean {
    client: Arc<RpcClient>,
    key: ComponentKey,
    id: u32,
}

impl Boolean {
    #[must_use]
    pub fn new(client: Arc<RpcClient>, id: u32) -> Self {
        Self {
            client,
            key: ComponentKey::instance("boolean", id),
            id,
        }
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Boolean.GetConfig`.
    pub async fn get_config(&self, ctx: &CallContext) -> Result<BooleanConfig> {
        unmarshal_config(ctx, self).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Boolean.SetConfig`.
    pub async fn set_config(
        &self,
        ctx: &CallContext,
        config: &BooleanConfig,
    ) -> Result<SetConfigResult> {
        set_config_with_id(ctx, self, config).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Boolean.GetStatus`.
    pub async fn get_status(&self, ctx: &CallContext) -> Result<BooleanStatus> {
        unmarshal_status(ctx, self).await
    }

    /// Set the value. The device acknowledges with an empty object.
    ///
    /// # Errors
    ///
    /// Transport or protocol errors from `Boolean.Set`.
    pub async fn set(&self, ctx: &CallContext, value: bool) -> Result<()> {
        let params = to_params("Boolean.Set", &BooleanSetParams { id: self.id, value })?;
        call_with_id(ctx, self, "Set", Some(params)).await?;
        Ok(())
    }
}

impl Component for Boolean {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
