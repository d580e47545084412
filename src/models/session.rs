use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::Content;

/// A stored conversation: the full transcript replayed to the model each turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    pub conversation_id: String,
    pub last_updated: DateTime<Local>,
    pub history: Vec<Content>,
}

impl Session {
    pub fn new(conversation_id: impl Into<String>, history: Vec<Content>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            last_updated: Local::now(),
            history,
        }
    }

    pub fn age_minutes(&self, now: DateTime<Local>) -> i64 {
        now.signed_duration_since(self.last_updated).num_minutes().abs()
    }
}
