mod content;
mod generation;
mod intent;
mod session;
mod tool;

pub use content::{Content, FunctionCall, FunctionResponse, InlineData, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER};
pub use generation::GenerationConfig;
pub use intent::{ConversationInput, ConversationResult, ErrorCode, IntentResponse, ResponseType};
pub use session::Session;
pub use tool::{FunctionDeclaration, Tool};
