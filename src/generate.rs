use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::api::response::{classify_response, extract_text};
use crate::api::{ChatModel, GenerateRequest, GenerationError};
use crate::config::defaults::{default_text_model, default_vision_model};
use crate::config::Config;
use crate::error::{GeminiFcError, Result};
use crate::models::{Content, GenerationConfig, Part, ROLE_USER};

/// Result of a one-shot generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub text: String,
}

/// One-shot text generation from a prompt plus optional local images, without
/// tools or conversation history.
pub struct ContentGenerator<'a> {
    model: &'a dyn ChatModel,
    text_model: String,
    vision_model: String,
    allowlist: Vec<PathBuf>,
    generation: Option<GenerationConfig>,
}

impl<'a> ContentGenerator<'a> {
    pub fn new(model: &'a dyn ChatModel, allowlist: Vec<PathBuf>) -> Self {
        Self {
            model,
            text_model: default_text_model(),
            vision_model: default_vision_model(),
            allowlist,
            generation: None,
        }
    }

    pub fn from_config(model: &'a dyn ChatModel, config: &Config) -> Self {
        let generate = &config.generate;
        Self {
            model,
            text_model: generate.text_model.clone().unwrap_or_else(default_text_model),
            vision_model: generate
                .vision_model
                .clone()
                .unwrap_or_else(default_vision_model),
            allowlist: generate
                .allowlist_external_dirs
                .iter()
                .map(PathBuf::from)
                .collect(),
            generation: Some(config.generation.clone()),
        }
    }

    pub async fn generate_content(
        &self,
        prompt: &str,
        image_filenames: &[PathBuf],
    ) -> Result<GeneratedContent> {
        let mut parts = vec![Part::text(prompt)];
        for filename in image_filenames {
            parts.push(self.load_image(filename).await?);
        }

        let model = if image_filenames.is_empty() {
            &self.text_model
        } else {
            &self.vision_model
        };
        debug!(model = %model, images = image_filenames.len(), "generating content");

        let request = GenerateRequest {
            model: model.clone(),
            contents: vec![Content::new(ROLE_USER, parts)],
            tools: Vec::new(),
            generation_config: self.generation.clone(),
        };

        let text = self
            .request_text(&request)
            .await
            .map_err(|e| GeminiFcError::Other(format!("Error generating content: {}", e)))?;
        Ok(GeneratedContent { text })
    }

    async fn request_text(&self, request: &GenerateRequest) -> std::result::Result<String, GenerationError> {
        let response = self.model.generate_content(request).await?;
        classify_response(&response)?;
        let text = extract_text(&response)?;
        if text.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }

    async fn load_image(&self, filename: &Path) -> Result<Part> {
        let display = filename.display();
        if !self.is_allowed_path(filename) {
            return Err(GeminiFcError::InvalidInput(format!(
                "Cannot read `{}`, no access to path; `allowlist_external_dirs` may need to be adjusted",
                display
            )));
        }
        if !filename.exists() {
            return Err(GeminiFcError::InvalidInput(format!(
                "`{}` does not exist",
                display
            )));
        }
        let mime_type = image_mime_type(filename).ok_or_else(|| {
            GeminiFcError::InvalidInput(format!("`{}` is not an image", display))
        })?;

        let bytes = tokio::fs::read(filename).await?;
        Ok(Part::inline_data(mime_type, STANDARD.encode(bytes)))
    }

    fn is_allowed_path(&self, path: &Path) -> bool {
        let resolved = match resolve_path(path) {
            Some(resolved) => resolved,
            None => return false,
        };
        self.allowlist.iter().any(|dir| {
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.clone());
            resolved.starts_with(dir)
        })
    }
}

/// Absolute form of `path`; symlinks are followed when the file exists, and a
/// missing path containing `..` is refused.
fn resolve_path(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Some(canonical);
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        std::env::current_dir().ok().map(|cwd| cwd.join(path))
    }
}

pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}
