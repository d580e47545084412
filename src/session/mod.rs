mod filesystem;
mod memory;
mod storage;

pub use filesystem::FilesystemSessionStore;
pub use memory::InMemorySessionStore;
pub use storage::SessionStore;

use uuid::Uuid;

use crate::config::defaults::ACKNOWLEDGEMENT;
use crate::models::{Content, ROLE_USER};

/// Slots 0 and 1 of every transcript: the rendered prompt and its acknowledgement.
pub const SKELETON_LEN: usize = 2;

pub fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}

/// History for a brand new conversation. Slot 0 is filled with the rendered
/// prompt at the start of each turn.
pub fn prompt_skeleton() -> Vec<Content> {
    vec![Content::user_text(""), Content::model_text(ACKNOWLEDGEMENT)]
}

/// Overwrite the skeleton with this turn's prompt, creating it if missing.
pub fn install_prompt(history: &mut Vec<Content>, rendered_prompt: &str) {
    if history.len() < SKELETON_LEN {
        *history = prompt_skeleton();
    }
    history[0] = Content::user_text(rendered_prompt);
    history[1] = Content::model_text(ACKNOWLEDGEMENT);
}

/// Drop the oldest exchanges so at most `max_turns` user turns remain after the
/// skeleton. A turn starts at a user text message and runs until the next one.
pub fn trim_conversation_history(history: &mut Vec<Content>, max_turns: usize) {
    let turn_starts: Vec<usize> = history
        .iter()
        .enumerate()
        .skip(SKELETON_LEN)
        .filter(|(_, c)| c.role == ROLE_USER)
        .map(|(i, _)| i)
        .collect();

    if turn_starts.len() <= max_turns {
        return;
    }

    let keep_from = if max_turns == 0 {
        history.len()
    } else {
        turn_starts[turn_starts.len() - max_turns]
    };
    history.drain(SKELETON_LEN..keep_from);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_MODEL;

    fn transcript(turns: usize) -> Vec<Content> {
        let mut history = prompt_skeleton();
        install_prompt(&mut history, "prompt");
        for i in 0..turns {
            history.push(Content::user_text(format!("q{}", i)));
            history.push(Content::model_text(format!("a{}", i)));
        }
        history
    }

    #[test]
    fn trimming_keeps_skeleton_and_latest_turns() {
        let mut history = transcript(4);
        trim_conversation_history(&mut history, 2);
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].text(), "prompt");
        assert_eq!(history[1].role, ROLE_MODEL);
        assert_eq!(history[2].text(), "q2");
        assert_eq!(history[5].text(), "a3");
    }

    #[test]
    fn trimming_below_limit_is_a_no_op() {
        let mut history = transcript(2);
        trim_conversation_history(&mut history, 5);
        assert_eq!(history.len(), 6);
    }

    #[test]
    fn install_prompt_overwrites_slot_zero() {
        let mut history = transcript(1);
        install_prompt(&mut history, "fresh prompt");
        assert_eq!(history[0].text(), "fresh prompt");
        assert_eq!(history[1].text(), ACKNOWLEDGEMENT);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn conversation_ids_are_unique() {
        assert_ne!(new_conversation_id(), new_conversation_id());
    }
}
