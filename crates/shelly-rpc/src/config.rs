//! Client and device configuration.
//!
//! Read from `<config_dir>/shelly/config.json`:
//!
//! ```json
//! {
//!   "client": { "requestTimeoutMs": 5000, "source": "kitchen-panel" },
//!   "devices": {
//!     "boiler": { "address": "192.168.1.40" },
//!     "garage": { "address": "192.168.1.41", "transport": "ws" }
//!   }
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::RpcClient;
use crate::context::CallContext;
use crate::error::{Error, Result};

fn default_request_timeout() -> u64 {
    10_000
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_source() -> String {
    "shelly-rs".to_string()
}

fn default_user_agent() -> String {
    concat!("shelly-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Deadline applied by [`RpcClient::default_context`]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Tag sent as `src`; the device echoes it back as `dst`
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            source: default_source(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    Ws,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub address: String,

    #[serde(default)]
    pub transport: TransportKind,
}

impl DeviceConfig {
    #[must_use]
    pub fn new(address: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            address: address.into(),
            transport,
        }
    }

    /// Open a client for this device with its configured transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the address is unusable or, for
    /// WebSocket devices, the connection cannot be established.
    pub async fn connect(&self, ctx: &CallContext, client: &ClientConfig) -> Result<RpcClient> {
        match self.transport {
            TransportKind::Http => RpcClient::http(&self.address, client),
            TransportKind::Ws => {
                let ctx = ctx.child().with_timeout(client.connect_timeout());
                RpcClient::websocket(&ctx, &self.address, client).await
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    /// Named devices
    #[serde(default)]
    pub devices: HashMap<String, DeviceConfig>,
}

impl Config {
    /// `<config_dir>/shelly/config.json` for the current platform.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "shelly").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load config from file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        warn_unknown_fields(&content, &path.display().to_string());
        serde_json::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load config from the platform default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => {
                warn!("Cannot determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Look up a named device; anything else is taken as an address reached
    /// over HTTP.
    #[must_use]
    pub fn resolve(&self, target: &str) -> DeviceConfig {
        self.devices
            .get(target)
            .cloned()
            .unwrap_or_else(|| DeviceConfig::new(target, TransportKind::Http))
    }
}

const TOP_LEVEL_KEYS: &[&str] = &["client", "devices"];
const CLIENT_KEYS: &[&str] = &["requestTimeoutMs", "connectTimeoutMs", "source", "userAgent"];
const DEVICE_KEYS: &[&str] = &["address", "transport"];

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    for path in find_unknown_keys(&value) {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

fn unknown_in(value: &Value, expected: &[&str], prefix: &str) -> Vec<String> {
    let Value::Object(obj) = value else {
        return Vec::new();
    };
    let expected: HashSet<&str> = expected.iter().copied().collect();

    obj.keys()
        .filter(|key| !expected.contains(key.as_str()))
        .map(|key| {
            if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            }
        })
        .collect()
}

/// Paths like `client.retries` or `devices.boiler.port`.
fn find_unknown_keys(value: &Value) -> Vec<String> {
    let mut unknowns = unknown_in(value, TOP_LEVEL_KEYS, "");

    if let Some(client) = value.get("client") {
        unknowns.extend(unknown_in(client, CLIENT_KEYS, "client"));
    }
    if let Some(Value::Object(devices)) = value.get("devices") {
        for (name, device) in devices {
            unknowns.extend(unknown_in(device, DEVICE_KEYS, &format!("devices.{name}")));
        }
    }

    unknowns
}
