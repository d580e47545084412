use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationSettings {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateContentConfig {
    #[serde(default)]
    pub text_model: Option<String>,
    #[serde(default)]
    pub vision_model: Option<String>,
    /// Directories images may be read from; nothing is readable when empty.
    #[serde(default)]
    pub allowlist_external_dirs: Vec<String>,
}
