use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomeAssistantConfig {
    /// Base URL of the Home Assistant instance, `${VAR}` references are expanded.
    #[serde(default)]
    pub url: Option<String>,
    /// Long-lived access token, `${VAR}` references are expanded.
    #[serde(default)]
    pub token: Option<String>,
}
