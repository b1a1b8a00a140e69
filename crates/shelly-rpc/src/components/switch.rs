//! `switch:<id>` relay outputs.

use std::sync::Arc;

use shelly_types::{
    ComponentKey, SetConfigResult, SwitchConfig, SwitchSetParams, SwitchSetResult, SwitchStatus,
};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{
    Component, id_params, request_with_id, set_config_with_id, to_params, unmarshal_config,
    unmarshal_status,
};

#[derive(Debug, Clone)]
pub struct Switch {
    client: Arc<RpcClient>,
    key: ComponentKey,
    id: u32,
}

impl Switch {
    #[must_use]
    pub fn new(client: Arc<RpcClient>, id: u32) -> Self {
        Self {
            client,
            key: ComponentKey::instance("switch", id),
            id,
        }
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Switch.GetConfig`.
    pub async fn get_config(&self, ctx: &CallContext) -> Result<SwitchConfig> {
        unmarshal_config(ctx, self).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Switch.SetConfig`, or
    /// `IdMismatch` if `config.id` names another switch.
    pub async fn set_config(
        &self,
        ctx: &CallContext,
        config: &SwitchConfig,
    ) -> Result<SetConfigResult> {
        set_config_with_id(ctx, self, config).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Switch.GetStatus`.
    pub async fn get_status(&self, ctx: &CallContext) -> Result<SwitchStatus> {
        unmarshal_status(ctx, self).await
    }

    /// Turn the output on or off, optionally flipping back after
    /// `toggle_after` seconds.
    ///
    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Switch.Set`.
    pub async fn set(
        &self,
        ctx: &CallContext,
        on: bool,
        toggle_after: Option<f64>,
    ) -> Result<SwitchSetResult> {
        let params = SwitchSetParams {
            id: self.id,
            on,
            toggle_after,
        };
        let params = to_params("Switch.Set", &params)?;
        request_with_id(ctx, self, "Set", Some(params)).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `Switch.Toggle`.
    pub async fn toggle(&self, ctx: &CallContext) -> Result<SwitchSetResult> {
        request_with_id(ctx, self, "Toggle", id_params(self)).await
    }
}

impl Component for Switch {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
