//! Generic helpers every component accessor is built on.
//!
//! A component is addressed by its [`ComponentKey`]. Instanced components
//! (`switch:0`) need their id in the params of every call; singletons
//! (`sys`) take none. These helpers take care of that so the accessors stay
//! one-liners.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use serde_json::{Map, Value, json};
use shelly_types::{ComponentKey, SetConfigResult};

use crate::client::{RpcClient, decode_result};
use crate::context::CallContext;
use crate::error::{Error, Result};

/// A handle on one component of one device.
pub trait Component {
    fn client(&self) -> &RpcClient;

    fn key(&self) -> &ComponentKey;

    fn id(&self) -> Option<u32> {
        self.key().id()
    }

    /// Full RPC method name for `action`, e.g. `Switch.GetStatus`.
    fn method(&self, action: &str) -> String {
        format!("{}.{action}", self.key().method_prefix())
    }
}

/// `{"id": n}` for instanced components, nothing for singletons.
#[must_use]
pub fn id_params<C: Component + ?Sized>(handle: &C) -> Option<Value> {
    handle.id().map(|id| json!({ "id": id }))
}

/// Serialize typed parameters.
///
/// # Errors
///
/// Returns `Error::InvalidRequest` if `params` cannot be represented as JSON.
pub fn to_params<P: Serialize + ?Sized>(method: &str, params: &P) -> Result<Value> {
    serde_json::to_value(params).map_err(|e| Error::InvalidRequest(format!("{method} params: {e}")))
}

fn id_matches(found: &Value, id: u32) -> bool {
    found.as_u64() == Some(u64::from(id))
}

/// Make sure `params` carries the handle's id.
///
/// A missing or `null` id is filled in; absent params become `{"id": n}`.
/// Singleton handles get their params back untouched. Applying this twice
/// gives the same result as applying it once.
///
/// # Errors
///
/// - `Error::IdMismatch` when `params` names a different component id
/// - `Error::InvalidRequest` when `params` is not an object
pub fn ensure_id<C: Component + ?Sized>(handle: &C, params: Option<Value>) -> Result<Option<Value>> {
    let Some(id) = handle.id() else {
        return Ok(params);
    };

    let mut object = match params {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(Error::InvalidRequest(format!(
                "params for {} must be an object, got {other}",
                handle.key()
            )));
        }
    };

    match object.get("id") {
        None | Some(Value::Null) => {
            object.insert("id".to_string(), Value::from(id));
        }
        Some(found) if id_matches(found, id) => {}
        Some(found) => {
            return Err(Error::IdMismatch {
                expected: id,
                found: found.clone(),
            });
        }
    }

    Ok(Some(Value::Object(object)))
}

/// Call `<Prefix>.<action>` with the handle's id injected into `params`.
///
/// # Errors
///
/// As [`ensure_id`] and [`RpcClient::call`].
pub async fn call_with_id<C: Component + ?Sized>(
    ctx: &CallContext,
    handle: &C,
    action: &str,
    params: Option<Value>,
) -> Result<Box<RawValue>> {
    let params = ensure_id(handle, params)?;
    handle.client().call(ctx, &handle.method(action), params).await
}

/// [`call_with_id`] and decode the result into `T`.
///
/// # Errors
///
/// As [`call_with_id`], plus `Error::Decode` when the result does not fit.
pub async fn request_with_id<T: DeserializeOwned, C: Component + ?Sized>(
    ctx: &CallContext,
    handle: &C,
    action: &str,
    params: Option<Value>,
) -> Result<T> {
    let method = handle.method(action);
    let raw = call_with_id(ctx, handle, action, params).await?;
    decode_result(&method, &raw)
}

/// Fetch `<Prefix>.GetConfig` and decode it into `T`.
///
/// # Errors
///
/// Transport and protocol errors from the call; `Error::Decode` when the
/// result does not fit `T`.
pub async fn unmarshal_config<T: DeserializeOwned, C: Component + ?Sized>(
    ctx: &CallContext,
    handle: &C,
) -> Result<T> {
    request_with_id(ctx, handle, "GetConfig", None).await
}

/// Fetch `<Prefix>.GetStatus` and decode it into `T`.
///
/// # Errors
///
/// Transport and protocol errors from the call; `Error::Decode` when the
/// result does not fit `T`.
pub async fn unmarshal_status<T: DeserializeOwned, C: Component + ?Sized>(
    ctx: &CallContext,
    handle: &C,
) -> Result<T> {
    request_with_id(ctx, handle, "GetStatus", None).await
}

/// Send `<Prefix>.SetConfig` with `{"id": n, "config": config}`.
///
/// Unknown members captured in the config's raw fields are sent back as
/// they are. An `id` inside `config` must match the handle's and is moved to
/// the outer params.
///
/// # Errors
///
/// `Error::InvalidRequest` if `config` is not a JSON object,
/// `Error::IdMismatch` if it names another component, and the errors of the
/// call itself.
pub async fn set_config_with_id<P: Serialize + ?Sized, C: Component + ?Sized>(
    ctx: &CallContext,
    handle: &C,
    config: &P,
) -> Result<SetConfigResult> {
    let method = handle.method("SetConfig");
    let Value::Object(mut config) = to_params(&method, config)? else {
        return Err(Error::InvalidRequest(format!(
            "{method}: config must serialize to an object"
        )));
    };

    let mut params = Map::new();
    if let Some(id) = handle.id() {
        match config.remove("id") {
            None | Some(Value::Null) => {}
            Some(found) if id_matches(&found, id) => {}
            Some(found) => return Err(Error::IdMismatch { expected: id, found }),
        }
        params.insert("id".to_string(), Value::from(id));
    }
    params.insert("config".to_string(), Value::Object(config));

    let raw = handle
        .client()
        .call(ctx, &method, Some(Value::Object(params)))
        .await?;
    decode_result(&method, &raw)
}
