//! The `sys` singleton.

use std::sync::Arc;

use shelly_types::{ComponentKey, SetConfigResult, SysConfig, SysStatus};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{Component, set_config_with_id, unmarshal_config, unmarshal_status};

#[derive(Debug, Clone)]
pub struct Sys {
    client: Arc<RpcClient>,
    key: ComponentKey,
}

impl Sys {
    #[must_use]
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            key: ComponentKey::singleton("sys"),
        }
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Sys.GetConfig`.
    pub async fn get_config(&self, ctx: &CallContext) -> Result<SysConfig> {
        unmarshal_config(ctx, self).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Sys.SetConfig`.
    pub async fn set_config(&self, ctx: &CallContext, config: &SysConfig) -> Result<SetConfigResult> {
        set_config_with_id(ctx, self, config).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Sys.GetStatus`.
    pub async fn get_status(&self, ctx: &CallContext) -> Result<SysStatus> {
        unmarshal_status(ctx, self).await
    }
}

impl Component for Sys {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
