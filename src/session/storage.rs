use crate::error::Result;
use crate::models::Session;

/// Trait for session storage backends
pub trait SessionStore: Send + Sync {
    /// Look up a live session; expired entries are dropped and reported as missing.
    fn get(&self, conversation_id: &str) -> Result<Option<Session>>;

    /// Insert or replace a session
    fn save(&self, session: &Session) -> Result<()>;

    fn remove(&self, conversation_id: &str) -> Result<()>;

    /// Find the most recent valid session
    fn find_recent(&self) -> Result<Option<Session>>;

    /// Clear all sessions
    fn clear_all(&self) -> Result<()>;
}
