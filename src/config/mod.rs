mod actions;
mod api;
pub mod defaults;
mod generation;
mod validation;

use crate::cli::Args;
use crate::models::GenerationConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub use actions::{ActionConfig, ActionsConfig};
pub use api::{ApiConfig, HomeAssistantConfig};
pub use generation::{GenerateContentConfig, GenerationSettings};
pub use validation::{expand_with, parse_bool};

use defaults::*;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub ttl_minutes: Option<i64>,
    #[serde(default)]
    pub max_sessions: Option<usize>,
    /// Keep at most this many user turns per conversation; unbounded when unset.
    #[serde(default)]
    pub max_turns: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub chat_model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeAssistantSettings {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub ttl_minutes: i64,
    pub max_sessions: usize,
    pub max_turns: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: default_session_ttl_minutes(),
            max_sessions: default_max_sessions(),
            max_turns: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_endpoint: String,
    pub request_timeout: u64,
    pub chat_model: String,
    pub prompt: String,
    pub generation: GenerationConfig,
    pub hass: HomeAssistantSettings,
    pub actions: ActionsConfig,
    pub session: SessionSettings,
    pub generate: GenerateContentConfig,
    pub language: String,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub generate: GenerateContentConfig,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self, String> {
        let file_config = match FileConfig::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {:#}", e);
                FileConfig::default()
            }
        };
        Self::from_sources(args, file_config, |key| env::var(key).ok())
    }

    /// Resolve every setting with precedence CLI args > env vars > config file > defaults.
    pub fn from_sources(
        args: &Args,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        // The API key is only read from the environment
        let api_key = env("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or("GEMINI_API_KEY environment variable not set")?;

        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| env("GEMINI_API_ENDPOINT"))
            .or(file.api.endpoint)
            .map(|endpoint| endpoint.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let request_timeout = env("GEMINI_REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(file.api.request_timeout)
            .unwrap_or_else(default_request_timeout);

        let chat_model = env("GEMINI_MODEL")
            .or(file.model.chat_model)
            .unwrap_or_else(default_chat_model);

        let prompt = env("GEMINI_PROMPT")
            .or(file.model.prompt)
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        let generation = GenerationConfig {
            temperature: parsed_env(&env, "GEMINI_TEMPERATURE")
                .or(file.generation.temperature)
                .unwrap_or_else(default_temperature),
            top_p: parsed_env(&env, "GEMINI_TOP_P")
                .or(file.generation.top_p)
                .unwrap_or_else(default_top_p),
            top_k: parsed_env(&env, "GEMINI_TOP_K")
                .or(file.generation.top_k)
                .unwrap_or_else(default_top_k),
            max_output_tokens: parsed_env(&env, "GEMINI_MAX_TOKENS")
                .or(file.generation.max_output_tokens)
                .unwrap_or_else(default_max_output_tokens),
        };
        validate_generation(&generation)?;

        let hass_url = args
            .hass_url
            .clone()
            .or_else(|| env("HASS_URL"))
            .or(file.home_assistant.url)
            .map(|url| expand_with(&url, &env))
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(default_hass_url);

        let hass_token = env("HASS_TOKEN")
            .or(file.home_assistant.token)
            .map(|token| expand_with(&token, &env))
            .filter(|token| !token.is_empty() && !token.contains("${"));

        let session = SessionSettings {
            ttl_minutes: file
                .session
                .ttl_minutes
                .unwrap_or_else(default_session_ttl_minutes),
            max_sessions: file
                .session
                .max_sessions
                .unwrap_or_else(default_max_sessions)
                .max(1),
            max_turns: file.session.max_turns,
        };
        validate_session(&session)?;

        let language = args
            .language
            .clone()
            .unwrap_or_else(default_language);

        let verbose = args.verbose
            || env("GEMINI_FC_VERBOSE")
                .and_then(|v| parse_bool(&v))
                .or(file.session.verbose)
                .unwrap_or(false);

        Ok(Config {
            api_key,
            api_endpoint,
            request_timeout,
            chat_model,
            prompt,
            generation,
            hass: HomeAssistantSettings {
                url: hass_url,
                token: hass_token,
            },
            actions: file.actions,
            session,
            generate: file.generate,
            language,
            verbose,
        })
    }
}

fn parsed_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|s| s.trim().parse::<T>().ok())
}

fn validate_generation(generation: &GenerationConfig) -> Result<(), String> {
    if !(0.0..=2.0).contains(&generation.temperature) {
        return Err(format!(
            "temperature must be between 0 and 2, got {}",
            generation.temperature
        ));
    }
    if !(0.0..=1.0).contains(&generation.top_p) {
        return Err(format!("top_p must be between 0 and 1, got {}", generation.top_p));
    }
    if generation.top_k == 0 {
        return Err("top_k must be at least 1".to_string());
    }
    if generation.max_output_tokens == 0 {
        return Err("max_output_tokens must be at least 1".to_string());
    }
    Ok(())
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(FileConfig::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|s| s.to_str());
        let config = if extension == Some("yaml") || extension == Some("yml") {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".gemini-fc.yaml"),
            PathBuf::from(".gemini-fc.yml"),
            PathBuf::from(".gemini-fc.json"),
        ];

        if let Some(config_dir) = Self::user_config_dir() {
            paths.push(config_dir.join("gemini-fc.yaml"));
            paths.push(config_dir.join("gemini-fc.yml"));
            paths.push(config_dir.join("gemini-fc.json"));
        }

        paths
    }

    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("gemini-fc"))
    }

    /// Write an example YAML config to the user config directory.
    pub fn init() -> Result<PathBuf> {
        let dir = Self::user_config_dir().context("Could not determine home directory")?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        let path = dir.join("gemini-fc.yaml");
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        fs::write(&path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# gemini-fc configuration
api:
  endpoint: https://generativelanguage.googleapis.com/v1beta
  request_timeout: 60

model:
  chat_model: models/gemini-2.0-flash
  # prompt: |
  #   This smart home is called {{ ha_name }}. The light is {{ states('light.1234567890') }}.

generation:
  temperature: 0.9
  top_p: 1.0
  top_k: 1
  max_output_tokens: 150

home_assistant:
  url: http://homeassistant.local:8123
  token: ${HASS_TOKEN}

actions:
  light_entity_id: light.1234567890
  thermostat_entity_id: climate.thermostat
  dispatch_timeout_secs: 10
  definitions:
    - name: lock_front_door
      description: Lock or unlock the front door. command is "lock" or "unlock".
      parameters:
        type: object
        properties:
          command:
            type: string
            enum: [lock, unlock]
        required: [command]
      domain: lock
      service: "{{command}}"
      entity_id: lock.front_door

session:
  ttl_minutes: 30
  max_sessions: 256

generate:
  allowlist_external_dirs:
    - /config/www
"#;

fn validate_session(session: &SessionSettings) -> Result<(), String> {
    if session.ttl_minutes <= 0 {
        return Err(format!(
            "ttl_minutes must be at least 1, got {}",
            session.ttl_minutes
        ));
    }
    if session.max_turns == Some(0) {
        return Err("max_turns must be at least 1".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_api_key() {
        let err = Config::from_sources(&Args::default(), FileConfig::default(), env_from(&[]))
            .unwrap_err();
        assert!(err.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = Config::from_sources(
            &Args::default(),
            FileConfig::default(),
            env_from(&[("GEMINI_API_KEY", "key")]),
        )
        .unwrap();
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.actions.light_entity_id, "light.1234567890");
        assert_eq!(config.session, SessionSettings::default());
        assert_eq!(config.language, "en");
        assert!(config.hass.token.is_none());
    }

    #[test]
    fn env_overrides_file_and_args_override_env() {
        let file: FileConfig = serde_yaml::from_str(
            r#"
api:
  endpoint: http://file.example/v1beta/
model:
  chat_model: models/file-model
generation:
  temperature: 0.2
  top_k: 3
home_assistant:
  url: http://file-hass:8123
  token: ${TOKEN_VAR}
"#,
        )
        .unwrap();

        let args = Args {
            hass_url: Some("http://cli-hass:8123/".to_string()),
            ..Default::default()
        };
        let config = Config::from_sources(
            &args,
            file,
            env_from(&[
                ("GEMINI_API_KEY", "key"),
                ("GEMINI_MODEL", "models/env-model"),
                ("GEMINI_TEMPERATURE", "0.5"),
                ("TOKEN_VAR", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_endpoint, "http://file.example/v1beta");
        assert_eq!(config.chat_model, "models/env-model");
        assert_eq!(config.generation.temperature, 0.5);
        assert_eq!(config.generation.top_k, 3);
        assert_eq!(config.hass.url, "http://cli-hass:8123");
        assert_eq!(config.hass.token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_out_of_range_generation_settings() {
        let err = Config::from_sources(
            &Args::default(),
            FileConfig::default(),
            env_from(&[("GEMINI_API_KEY", "key"), ("GEMINI_TOP_P", "1.5")]),
        )
        .unwrap_err();
        assert!(err.contains("top_p"));
    }

    #[test]
    fn rejects_non_positive_session_ttl() {
        for ttl in ["0", "-5"] {
            let file: FileConfig =
                serde_yaml::from_str(&format!("session:\n  ttl_minutes: {}\n", ttl)).unwrap();
            let err = Config::from_sources(
                &Args::default(),
                file,
                env_from(&[("GEMINI_API_KEY", "key")]),
            )
            .unwrap_err();
            assert!(err.contains("ttl_minutes"));
        }

        let file: FileConfig = serde_yaml::from_str("session:\n  max_turns: 0\n").unwrap();
        let err = Config::from_sources(&Args::default(), file, env_from(&[("GEMINI_API_KEY", "key")]))
            .unwrap_err();
        assert!(err.contains("max_turns"));
    }

    #[test]
    fn example_config_parses() {
        let config: FileConfig = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.actions.definitions.len(), 1);
        assert_eq!(config.actions.definitions[0].domain.as_deref(), Some("lock"));
        assert_eq!(config.generate.allowlist_external_dirs, vec!["/config/www"]);
    }
}
