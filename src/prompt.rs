use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{GeminiFcError, Result};
use crate::hass::HomeAssistant;

/// Renders the system prompt against live host state.
///
/// Supported expressions:
/// - `{{ ha_name }}`: the home's location name
/// - `{{ states('light.kitchen') }}`: an entity state, `unknown` when absent
/// - `{{ now }}`: today's local date
pub struct PromptRenderer<'a> {
    host: &'a dyn HomeAssistant,
}

fn states_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^states\(\s*['"]([a-z0-9_]+\.[a-z0-9_]+)['"]\s*\)$"#).expect("static regex")
    })
}

impl<'a> PromptRenderer<'a> {
    pub fn new(host: &'a dyn HomeAssistant) -> Self {
        Self { host }
    }

    pub async fn render(&self, template: &str) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or_else(|| {
                GeminiFcError::PromptRender(format!(
                    "unexpected end of template, expected '}}}}' after '{}'",
                    preview(after_open)
                ))
            })?;
            let expression = after_open[..end].trim();
            output.push_str(&self.evaluate(expression).await?);
            rest = &after_open[end + 2..];
        }

        output.push_str(rest);
        Ok(output)
    }

    async fn evaluate(&self, expression: &str) -> Result<String> {
        match expression {
            "ha_name" => self
                .host
                .location_name()
                .await
                .map_err(|e| GeminiFcError::PromptRender(format!("cannot read home name: {}", e))),
            "now" => Ok(Local::now().format("%Y-%m-%d").to_string()),
            _ => {
                let caps = states_call().captures(expression).ok_or_else(|| {
                    GeminiFcError::PromptRender(format!("'{}' is undefined", expression))
                })?;
                let entity_id = &caps[1];
                let state = self.host.get_state(entity_id).await.map_err(|e| {
                    GeminiFcError::PromptRender(format!(
                        "cannot read state of {}: {}",
                        entity_id, e
                    ))
                })?;
                Ok(state.unwrap_or_else(|| "unknown".to_string()))
            }
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(20).collect()
}
