//! Typed accessors for individual device components.
//!
//! Each accessor is a cheap handle: an `Arc<RpcClient>` plus the component's
//! key. Handles hold no state of their own and can be cloned freely.

mod boolean;
mod kvs;
mod shelly;
mod switch;
mod sys;

use std::sync::Arc;

use serde_json::{Map, Value};
use shelly_types::{ComponentKey, SetConfigResult};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::helpers::{Component, request_with_id, set_config_with_id, unmarshal_config, unmarshal_status};

pub use boolean::Boolean;
pub use kvs::Kvs;
pub use shelly::Shelly;
pub use switch::Switch;
pub use sys::Sys;

/// Accessor for any component by key, with untyped config and status.
///
/// Useful for components without a typed accessor, or when the key is only
/// known at runtime.
#[derive(Debug, Clone)]
pub struct AnyComponent {
    client: Arc<RpcClient>,
    key: ComponentKey,
}

impl AnyComponent {
    #[must_use]
    pub fn new(client: Arc<RpcClient>, key: ComponentKey) -> Self {
        Self { client, key }
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `<Prefix>.GetConfig`.
    pub async fn get_config(&self, ctx: &CallContext) -> Result<Map<String, Value>> {
        unmarshal_config(ctx, self).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `<Prefix>.SetConfig`.
    pub async fn set_config(
        &self,
        ctx: &CallContext,
        config: &Map<String, Value>,
    ) -> Result<SetConfigResult> {
        set_config_with_id(ctx, self, config).await
    }

    /// # Errors
    ///
    /// Transport, protocol or decode errors from `<Prefix>.GetStatus`.
    pub async fn get_status(&self, ctx: &CallContext) -> Result<Map<String, Value>> {
        unmarshal_status(ctx, self).await
    }

    /// Invoke `<Prefix>.<action>` with the component id filled in.
    ///
    /// # Errors
    ///
    /// As [`request_with_id`].
    pub async fn invoke(
        &self,
        ctx: &CallContext,
        action: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        request_with_id(ctx, self, action, params).await
    }
}

impl Component for AnyComponent {
    fn client(&self) -> &RpcClient {
        &self.client
    }

    fn key(&self) -> &ComponentKey {
        &self.key
    }
}
