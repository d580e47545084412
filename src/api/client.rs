use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::api::models::ApiErrorBody;
use crate::api::{ChatModel, GenerateContentResponse, GenerateRequest, GenerationError, ModelInfo};
use crate::config::Config;
use crate::error::{GeminiFcError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// REST client for the Generative Language API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| GeminiFcError::ConfigError(format!("Invalid API key header: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_key, &config.api_endpoint, config.request_timeout)
    }

    /// Accepts both `gemini-pro` and `models/gemini-pro`.
    fn model_url(&self, model: &str) -> String {
        if model.starts_with("models/") || model.starts_with("tunedModels/") {
            format!("{}/{}", self.endpoint, model)
        } else {
            format!("{}/models/{}", self.endpoint, model)
        }
    }

    pub async fn get_model(&self, model: &str) -> std::result::Result<ModelInfo, GenerationError> {
        let response = self.http.get(self.model_url(model)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<ModelInfo>().await?)
    }

    /// Check that the credentials work and the configured model exists.
    pub async fn verify_model(&self, model: &str) -> Result<ModelInfo> {
        match self.get_model(model).await {
            Ok(info) => Ok(info),
            Err(e) if e.is_invalid_api_key() => {
                Err(GeminiFcError::ConfigError(format!("Invalid API key: {}", e)))
            }
            Err(e) => Err(GeminiFcError::RemoteGeneration(e)),
        }
    }

    /// Send an arbitrary JSON body and return the raw JSON answer.
    pub async fn generate_raw(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, GenerationError> {
        let url = format!("{}:generateContent", self.model_url(model));
        let response = self.http.post(url).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateContentResponse, GenerationError> {
        let url = format!("{}:generateContent", self.model_url(&request.model));
        debug!(
            model = request.model.as_str(),
            contents = request.contents.len(),
            tools = request.tools.len(),
            "generateContent"
        );

        let response = self.http.post(url).json(request).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(parse_api_error(status, &body))
}

/// Turn an error body like `{"error": {"message": ..., "details": [{"reason": ...}]}}`
/// into a `GenerationError`.
pub fn parse_api_error(status: u16, body: &str) -> GenerationError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let reason = parsed
                .error
                .details
                .iter()
                .find_map(|d| d.get("reason").and_then(|r| r.as_str()))
                .map(|r| r.to_string())
                .or(parsed.error.status);
            GenerationError::Api {
                status,
                reason,
                message: parsed.error.message,
            }
        }
        Err(_) => GenerationError::Api {
            status,
            reason: None,
            message: if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_url_accepts_prefixed_and_bare_names() {
        let client = GeminiClient::new("key", "http://localhost/v1beta/", 5).unwrap();
        assert_eq!(
            client.model_url("models/gemini-pro"),
            "http://localhost/v1beta/models/gemini-pro"
        );
        assert_eq!(
            client.model_url("gemini-pro"),
            "http://localhost/v1beta/models/gemini-pro"
        );
    }

    #[test]
    fn parses_invalid_key_reason() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT",
            "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]}}"#;
        let err = parse_api_error(400, body);
        assert!(err.is_invalid_api_key());
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = parse_api_error(502, "bad gateway");
        assert_eq!(
            err,
            GenerationError::Api {
                status: 502,
                reason: None,
                message: "bad gateway".to_string()
            }
        );
    }
}
