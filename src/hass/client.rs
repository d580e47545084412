use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::HomeAssistant;
use crate::config::Config;
use crate::error::{GeminiFcError, Result};

/// Home Assistant REST API client authenticated with a long-lived access token.
#[derive(Clone)]
pub struct HomeAssistantClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct StateResponse {
    state: String,
}

#[derive(Deserialize)]
struct ConfigResponse {
    #[serde(default)]
    location_name: String,
}

impl HomeAssistantClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                GeminiFcError::ConfigError(format!("Invalid authorization header: {}", e))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.hass.url,
            config.hass.token.as_deref(),
            config.request_timeout,
        )
    }
}

#[async_trait]
impl HomeAssistant for HomeAssistantClient {
    async fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<Value> {
        for segment in [domain, service] {
            if !is_valid_slug(segment) {
                return Err(GeminiFcError::InvalidInput(format!(
                    "Invalid service name: {}.{}",
                    domain, service
                )));
            }
        }

        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);
        debug!(domain, service, "calling Home Assistant service");

        let response = self.http.post(url).json(data).send().await?;
        let response = check_status(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_state(&self, entity_id: &str) -> Result<Option<String>> {
        if !is_valid_entity_id(entity_id) {
            return Err(GeminiFcError::InvalidInput(format!(
                "Invalid entity id: {}",
                entity_id
            )));
        }

        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let state: StateResponse = response.json().await?;
        Ok(Some(state.state))
    }

    async fn location_name(&self) -> Result<String> {
        let url = format!("{}/api/config", self.base_url);
        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;
        let config: ConfigResponse = response.json().await?;
        Ok(config.location_name)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(GeminiFcError::ApiError { status, message })
}

/// Domains, services and object ids are lowercase slugs.
pub fn is_valid_slug(value: &str) -> bool {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").expect("static regex"))
        .is_match(value)
}

fn is_valid_entity_id(entity_id: &str) -> bool {
    match entity_id.split_once('.') {
        Some((domain, object_id)) => is_valid_slug(domain) && is_valid_slug(object_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_entity_ids() {
        assert!(is_valid_entity_id("light.1234567890"));
        assert!(is_valid_entity_id("climate.thermostat"));
        assert!(!is_valid_entity_id("light"));
        assert!(!is_valid_entity_id("light.../../api"));
        assert!(!is_valid_slug("turn_on/../restart"));
    }
}
