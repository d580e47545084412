mod output;

pub use output::{display_action, display_conversation_id, display_error, display_result};
