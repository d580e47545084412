use std::fmt;

use crate::api::GenerationError;

#[derive(Debug)]
pub enum GeminiFcError {
    ApiError {
        status: u16,
        message: String,
    },
    ConfigError(String),
    PromptRender(String),
    RemoteGeneration(GenerationError),
    SessionError(String),
    InvalidInput(String),
    NetworkError(reqwest::Error),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl fmt::Display for GeminiFcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiFcError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            GeminiFcError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            GeminiFcError::PromptRender(msg) => write!(f, "{}", msg),
            GeminiFcError::RemoteGeneration(e) => write!(f, "{}", e),
            GeminiFcError::SessionError(msg) => write!(f, "Session error: {}", msg),
            GeminiFcError::InvalidInput(msg) => write!(f, "{}", msg),
            GeminiFcError::NetworkError(e) => write!(f, "Network error: {}", e),
            GeminiFcError::IoError(e) => write!(f, "IO error: {}", e),
            GeminiFcError::JsonError(e) => write!(f, "JSON error: {}", e),
            GeminiFcError::YamlError(e) => write!(f, "YAML error: {}", e),
            GeminiFcError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GeminiFcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeminiFcError::RemoteGeneration(e) => Some(e),
            GeminiFcError::NetworkError(e) => Some(e),
            GeminiFcError::IoError(e) => Some(e),
            GeminiFcError::JsonError(e) => Some(e),
            GeminiFcError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GenerationError> for GeminiFcError {
    fn from(err: GenerationError) -> Self {
        GeminiFcError::RemoteGeneration(err)
    }
}

impl From<reqwest::Error> for GeminiFcError {
    fn from(err: reqwest::Error) -> Self {
        GeminiFcError::NetworkError(err)
    }
}

impl From<std::io::Error> for GeminiFcError {
    fn from(err: std::io::Error) -> Self {
        GeminiFcError::IoError(err)
    }
}

impl From<serde_json::Error> for GeminiFcError {
    fn from(err: serde_json::Error) -> Self {
        GeminiFcError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for GeminiFcError {
    fn from(err: serde_yaml::Error) -> Self {
        GeminiFcError::YamlError(err)
    }
}

impl From<anyhow::Error> for GeminiFcError {
    fn from(err: anyhow::Error) -> Self {
        GeminiFcError::ConfigError(format!("{:#}", err))
    }
}

impl From<String> for GeminiFcError {
    fn from(msg: String) -> Self {
        GeminiFcError::Other(msg)
    }
}

impl From<&str> for GeminiFcError {
    fn from(msg: &str) -> Self {
        GeminiFcError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeminiFcError>;
