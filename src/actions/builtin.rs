use serde_json::json;
use std::collections::BTreeMap;

use super::registry::ActionSpec;

pub const CONTROL_LIGHT: &str = "control_light";
pub const SET_HEATING_AND_COOLING: &str = "set_heating_and_cooling";

/// The two actions every agent starts with.
pub fn builtin_actions(light_entity_id: &str, thermostat_entity_id: &str) -> Vec<ActionSpec> {
    vec![
        control_light(light_entity_id),
        set_heating_and_cooling(thermostat_entity_id),
    ]
}

fn control_light(entity_id: &str) -> ActionSpec {
    ActionSpec {
        name: CONTROL_LIGHT.to_string(),
        description: r#"Turn a light on or off.

Args:
    command: Whether to "turn_on" or "turn_off" the light.

Example input: Light on
Example output: {"command": "turn_on"}

Example input: Light off
Example output: {"command": "turn_off"}"#
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["turn_on", "turn_off"]
                }
            },
            "required": ["command"]
        }),
        domain: "homeassistant".to_string(),
        service: "{{command}}".to_string(),
        entity_id: Some(entity_id.to_string()),
        data: BTreeMap::new(),
    }
}

fn set_heating_and_cooling(entity_id: &str) -> ActionSpec {
    let mut data = BTreeMap::new();
    data.insert("target_temp_low".to_string(), json!("{{heat_temp}}"));
    data.insert("target_temp_high".to_string(), json!("{{cool_temp}}"));

    ActionSpec {
        name: SET_HEATING_AND_COOLING.to_string(),
        description: r#"Set the heat and cooling temperatures of the thermostat.

Args:
    cool_temp: The cool temperature to set to in °F. Must be set to the heat temp plus 3.
    heat_temp: The heat temperature to set to in °F. Must be set to the cool temp minus 3.

Example input: Set the heat to 74 degrees.
Example output: {"cool_temp": 77, "heat_temp": 74}

Example input: Set the cooling to 73 degrees.
Example output: {"cool_temp": 73, "heat_temp": 69}"#
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "cool_temp": {"type": "integer"},
                "heat_temp": {"type": "integer"}
            },
            "required": ["cool_temp", "heat_temp"]
        }),
        domain: "climate".to_string(),
        service: "set_temperature".to_string(),
        entity_id: Some(entity_id.to_string()),
        data,
    }
}
