use std::fmt;

/// Every way a remote generation call can fail, normalized into one type.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The request never got an HTTP response (DNS, TLS, connection reset, timeout).
    Transport(String),
    /// The API answered with a non-success status.
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },
    /// The request or the response was malformed.
    InvalidArgument(String),
    /// The prompt was rejected by the safety filters.
    BlockedPrompt(String),
    /// The candidate stopped for a reason other than STOP or MAX_TOKENS.
    StoppedCandidate(String),
}

impl GenerationError {
    pub fn is_invalid_api_key(&self) -> bool {
        matches!(self, GenerationError::Api { reason: Some(reason), .. } if reason == "API_KEY_INVALID")
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(msg) => write!(f, "transport error: {}", msg),
            GenerationError::Api {
                status, message, ..
            } => write!(f, "{} {}", status, message),
            GenerationError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            GenerationError::BlockedPrompt(reason) => {
                write!(f, "prompt was blocked: {}", reason)
            }
            GenerationError::StoppedCandidate(reason) => {
                write!(f, "generation stopped early: {}", reason)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GenerationError::InvalidArgument(format!("could not decode response: {}", err))
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}
