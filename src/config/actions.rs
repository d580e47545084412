use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::defaults::{
    default_action_enabled, default_dispatch_timeout, default_light_entity_id,
    default_thermostat_entity_id,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionsConfig {
    #[serde(default = "default_light_entity_id")]
    pub light_entity_id: String,
    #[serde(default = "default_thermostat_entity_id")]
    pub thermostat_entity_id: String,
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,
    #[serde(default)]
    pub definitions: Vec<ActionConfig>,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            light_entity_id: default_light_entity_id(),
            thermostat_entity_id: default_thermostat_entity_id(),
            dispatch_timeout_secs: default_dispatch_timeout(),
            definitions: Vec::new(),
        }
    }
}

/// A function the model may call, mapped onto one Home Assistant service call.
///
/// Entries named like a built-in override the built-in field by field; new
/// names must provide `description`, `parameters`, `domain` and `service`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionConfig {
    pub name: String,
    #[serde(default = "default_action_enabled")]
    pub enabled: bool,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON schema of the function arguments.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Service name, may contain `{{argument}}` placeholders.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Service data fields; string values may contain `{{argument}}` placeholders.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
}
