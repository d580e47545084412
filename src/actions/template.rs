use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex"))
}

fn whole_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{\s*([A-Za-z0-9_]+)\s*\}\}$").expect("static regex"))
}

/// Render a service data value. A string that is exactly one placeholder takes
/// the argument's JSON value as is, so integers stay integers.
pub fn render_value(template: &Value, arguments: &Value) -> Result<Value, String> {
    match template {
        Value::String(s) => {
            if let Some(caps) = whole_placeholder().captures(s) {
                return lookup(&caps[1], arguments).cloned();
            }
            render_str(s, arguments).map(Value::String)
        }
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, arguments))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (key, value) in map {
                rendered.insert(key.clone(), render_value(value, arguments)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Replace every `{{key}}` with the argument's textual value.
pub fn render_str(template: &str, arguments: &Value) -> Result<String, String> {
    // Collect replacements first so a substituted value is never rescanned
    let mut replacements = Vec::new();
    for cap in placeholder().captures_iter(template) {
        let whole = cap.get(0).expect("group 0 always matches");
        let value = lookup(&cap[1], arguments)?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        replacements.push((whole.start(), whole.end(), text));
    }

    let mut result = template.to_string();
    for (start, end, text) in replacements.into_iter().rev() {
        result.replace_range(start..end, &text);
    }
    Ok(result)
}

fn lookup<'a>(key: &str, arguments: &'a Value) -> Result<&'a Value, String> {
    arguments
        .get(key)
        .ok_or_else(|| format!("Missing required argument: {}", key))
}
