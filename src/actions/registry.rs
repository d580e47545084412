use jsonschema::{Draft, JSONSchema};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::builtin::builtin_actions;
use super::template::{render_str, render_value};
use crate::config::{ActionConfig, ActionsConfig};
use crate::hass::is_valid_slug;
use crate::models::{FunctionCall, FunctionDeclaration, Tool};

/// A function exposed to the model and the service call it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    /// JSON schema (draft 7) of the arguments object.
    pub parameters: Value,
    pub domain: String,
    /// Service name, may contain `{{argument}}` placeholders.
    pub service: String,
    pub entity_id: Option<String>,
    pub data: BTreeMap<String, Value>,
}

/// A fully rendered Home Assistant service invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl ServiceCall {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }
}

/// The closed set of functions the model may call during a turn.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<ActionSpec>,
}

impl ActionRegistry {
    pub fn new(actions: Vec<ActionSpec>) -> Self {
        Self { actions }
    }

    /// Built-in actions, then config entries: a matching name overrides or
    /// disables the built-in, a new name registers an extra action.
    pub fn from_config(config: &ActionsConfig) -> Self {
        let mut registry = Self::new(builtin_actions(
            &config.light_entity_id,
            &config.thermostat_entity_id,
        ));

        for entry in &config.definitions {
            if !entry.enabled {
                registry.actions.retain(|a| a.name != entry.name);
                continue;
            }

            let candidate = match registry.get(&entry.name) {
                Some(existing) => Ok(merge(existing.clone(), entry)),
                None => from_entry(entry),
            };

            match candidate.and_then(|spec| check_spec(&spec).map(|_| spec)) {
                Ok(spec) => registry.insert(spec),
                Err(e) => warn!("Skipping action '{}': {}", entry.name, e),
            }
        }

        registry
    }

    fn insert(&mut self, spec: ActionSpec) {
        match self.actions.iter_mut().find(|a| a.name == spec.name) {
            Some(slot) => *slot = spec,
            None => self.actions.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn list(&self) -> &[ActionSpec] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Declarations in the schema dialect the Generative Language API expects.
    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.actions
            .iter()
            .map(|a| FunctionDeclaration {
                name: a.name.clone(),
                description: a.description.clone(),
                parameters: to_api_schema(&a.parameters),
            })
            .collect()
    }

    pub fn tools(&self) -> Vec<Tool> {
        if self.actions.is_empty() {
            return Vec::new();
        }
        vec![Tool {
            function_declarations: self.function_declarations(),
        }]
    }

    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<(), String> {
        let action = self
            .get(name)
            .ok_or_else(|| format!("Unknown function '{}'", name))?;

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&action.parameters)
            .map_err(|e| format!("Invalid action schema: {}", e))?;

        if let Err(errors) = schema.validate(arguments) {
            let error_messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            return Err(error_messages.join("; "));
        }

        Ok(())
    }

    /// Turn a model function call into the service call it stands for.
    pub fn resolve(&self, call: &FunctionCall) -> Result<ServiceCall, String> {
        let action = self
            .get(&call.name)
            .ok_or_else(|| format!("Unknown function '{}'", call.name))?;
        let arguments = call.arguments();
        self.validate_arguments(&call.name, &arguments)?;

        let service = render_str(&action.service, &arguments)?;
        if !is_valid_slug(&service) {
            return Err(format!(
                "Rendered service '{}' is not a valid service name",
                service
            ));
        }

        let mut data = Map::new();
        if let Some(entity_id) = &action.entity_id {
            data.insert("entity_id".to_string(), Value::String(entity_id.clone()));
        }
        for (key, template) in &action.data {
            data.insert(key.clone(), render_value(template, &arguments)?);
        }

        Ok(ServiceCall {
            domain: action.domain.clone(),
            service,
            data: Value::Object(data),
        })
    }
}

fn merge(mut spec: ActionSpec, entry: &ActionConfig) -> ActionSpec {
    if let Some(description) = &entry.description {
        spec.description = description.clone();
    }
    if let Some(parameters) = &entry.parameters {
        spec.parameters = parameters.clone();
    }
    if let Some(domain) = &entry.domain {
        spec.domain = domain.clone();
    }
    if let Some(service) = &entry.service {
        spec.service = service.clone();
    }
    if let Some(entity_id) = &entry.entity_id {
        spec.entity_id = Some(entity_id.clone());
    }
    if !entry.data.is_empty() {
        spec.data = entry.data.clone();
    }
    spec
}

fn from_entry(entry: &ActionConfig) -> Result<ActionSpec, String> {
    let missing = |field: &str| format!("missing '{}'", field);
    Ok(ActionSpec {
        name: entry.name.clone(),
        description: entry
            .description
            .clone()
            .ok_or_else(|| missing("description"))?,
        parameters: entry
            .parameters
            .clone()
            .ok_or_else(|| missing("parameters"))?,
        domain: entry.domain.clone().ok_or_else(|| missing("domain"))?,
        service: entry.service.clone().ok_or_else(|| missing("service"))?,
        entity_id: entry.entity_id.clone(),
        data: entry.data.clone(),
    })
}

fn check_spec(spec: &ActionSpec) -> Result<(), String> {
    if !is_valid_function_name(&spec.name) {
        return Err(format!("'{}' is not a valid function name", spec.name));
    }
    if !is_valid_slug(&spec.domain) {
        return Err(format!("'{}' is not a valid domain", spec.domain));
    }
    if spec.parameters.get("type").and_then(Value::as_str) != Some("object") {
        return Err("parameters must be an object schema".to_string());
    }
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&spec.parameters)
        .map_err(|e| format!("Invalid parameters schema: {}", e))?;
    Ok(())
}

/// Letters, digits, underscores and dashes, up to 64 chars, not starting with a digit.
fn is_valid_function_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The API takes an OpenAPI subset: upper-case type names, no
/// `additionalProperties` or `$schema`.
pub fn to_api_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "additionalProperties" | "$schema" | "default" => {}
                    "type" => {
                        let converted = match value.as_str() {
                            Some(t) => Value::String(t.to_uppercase()),
                            None => value.clone(),
                        };
                        out.insert(key.clone(), converted);
                    }
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|p| {
                                p.iter()
                                    .map(|(name, s)| (name.clone(), to_api_schema(s)))
                                    .collect::<Map<_, _>>()
                            })
                            .unwrap_or_default();
                        out.insert(key.clone(), Value::Object(props));
                    }
                    "items" => {
                        out.insert(key.clone(), to_api_schema(value));
                    }
                    _ => {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
