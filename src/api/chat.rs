use crate::api::response::{classify_response, first_candidate};
use crate::api::{ChatModel, GenerateContentResponse, GenerateRequest, GenerationError};
use crate::models::{Content, GenerationConfig, Tool, ROLE_MODEL};

/// Multi-turn chat over a `ChatModel`.
///
/// The history only grows when an exchange succeeds: a failed call leaves it
/// exactly as it was before `send_message`.
pub struct ChatSession<'a> {
    model: &'a dyn ChatModel,
    model_name: String,
    tools: Vec<Tool>,
    generation: Option<GenerationConfig>,
    history: Vec<Content>,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        model_name: impl Into<String>,
        tools: Vec<Tool>,
        generation: Option<GenerationConfig>,
        history: Vec<Content>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            tools,
            generation,
            history,
        }
    }

    pub async fn send_message(
        &mut self,
        content: Content,
    ) -> Result<GenerateContentResponse, GenerationError> {
        if is_empty_message(&content) {
            return Err(GenerationError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }

        let mut contents = self.history.clone();
        contents.push(content.clone());

        let request = GenerateRequest {
            model: self.model_name.clone(),
            contents,
            tools: self.tools.clone(),
            generation_config: self.generation.clone(),
        };

        let response = self.model.generate_content(&request).await?;
        classify_response(&response)?;

        let mut reply = first_candidate(&response)?.content.clone();
        if reply.parts.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "response candidate had no content".to_string(),
            ));
        }
        if reply.role.is_empty() {
            reply.role = ROLE_MODEL.to_string();
        }

        self.history.push(content);
        self.history.push(reply);
        Ok(response)
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Content> {
        self.history
    }
}

fn is_empty_message(content: &Content) -> bool {
    content.parts.is_empty()
        || content.parts.iter().all(|p| {
            p.function_call.is_none()
                && p.function_response.is_none()
                && p.inline_data.is_none()
                && p.text.as_deref().map_or(true, |t| t.trim().is_empty())
        })
}
