//! Switch component (`switch:<id>`).

use serde::{Deserialize, Serialize};

use crate::{Nullable, RawFields};

/// How the switch reacts to its associated input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InMode {
    Momentary,
    Follow,
    Flip,
    Detached,
    Cycle,
    Activate,
    /// Mode reported by newer firmware
    #[serde(untagged)]
    Other(String),
}

/// Output state applied on power-on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    Off,
    On,
    RestoreLast,
    MatchInput,
    #[serde(untagged)]
    Other(String),
}

/// `Switch.GetConfig` result and `Switch.SetConfig` payload.
///
/// All fields are optional so a partial config can be sent to `SetConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(
        default,
        deserialize_with = "crate::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Nullable<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_mode: Option<InMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<InitialState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_on_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_off: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_off_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_limit: Option<f64>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// Accumulated active energy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyCounter {
    /// Total energy in Wh
    pub total: f64,
    #[serde(default)]
    pub by_minute: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute_ts: Option<i64>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(rename = "tC")]
    pub celsius: Option<f64>,
    #[serde(rename = "tF")]
    pub fahrenheit: Option<f64>,
}

/// `Switch.GetStatus` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatus {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_started_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_duration: Option<f64>,
    /// Active power in W
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aenergy: Option<EnergyCounter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}

/// `Switch.Set` parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSetParams {
    pub id: u32,
    pub on: bool,
    /// Flip back after this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggle_after: Option<f64>,
}

/// `Switch.Set` / `Switch.Toggle` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchSetResult {
    pub was_on: bool,
    #[serde(flatten)]
    pub raw_fields: RawFields,
}
