pub mod chat;
pub mod client;
mod error;
pub mod models;
pub mod response;

use async_trait::async_trait;

pub use chat::ChatSession;
pub use client::GeminiClient;
pub use error::GenerationError;
pub use models::{
    Candidate, GenerateContentResponse, GenerateRequest, ModelInfo, PromptFeedback, SafetyRating,
};

/// Remote chat completion: one `generateContent` exchange with a hosted model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateContentResponse, GenerationError>;
}
