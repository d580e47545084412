use serde::{Deserialize, Serialize};

/// One utterance handed to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInput {
    pub text: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub language: String,
}

impl ConversationInput {
    pub fn new(text: impl Into<String>, conversation_id: Option<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            conversation_id,
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    ActionDone,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub language: String,
    pub response_type: ResponseType,
    pub speech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl IntentResponse {
    pub fn speech(language: &str, speech: impl Into<String>) -> Self {
        Self {
            language: language.to_string(),
            response_type: ResponseType::ActionDone,
            speech: speech.into(),
            error_code: None,
        }
    }

    pub fn error(language: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            language: language.to_string(),
            response_type: ResponseType::Error,
            speech: message.into(),
            error_code: Some(code),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }
}

/// The reply to one turn plus the id the caller must send with the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub response: IntentResponse,
    pub conversation_id: String,
}
