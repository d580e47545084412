pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_PROMPT: &str = "This smart home is controlled by Home Assistant and is called {{ ha_name }}.
You are its voice assistant. Answer the user's questions about the world truthfully and keep replies short.
When the user asks to switch the light or change the heating and cooling, call the matching function.
Do not ask the user for confirmation before calling a function.";

pub const ACKNOWLEDGEMENT: &str = "Ok";

pub fn default_chat_model() -> String {
    "models/gemini-2.0-flash".to_string()
}

pub fn default_text_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub fn default_vision_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub fn default_temperature() -> f64 {
    0.9
}

pub fn default_top_p() -> f64 {
    1.0
}

pub fn default_top_k() -> u32 {
    1
}

pub fn default_max_output_tokens() -> u32 {
    150
}

pub fn default_request_timeout() -> u64 {
    60
}

pub fn default_dispatch_timeout() -> u64 {
    10
}

pub fn default_hass_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

pub fn default_light_entity_id() -> String {
    "light.1234567890".to_string()
}

pub fn default_thermostat_entity_id() -> String {
    "climate.thermostat".to_string()
}

pub fn default_action_enabled() -> bool {
    true
}

pub fn default_session_ttl_minutes() -> i64 {
    30
}

pub fn default_max_sessions() -> usize {
    256
}

pub fn default_language() -> String {
    "en".to_string()
}
