use chrono::Local;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::storage::SessionStore;
use crate::config::SessionSettings;
use crate::error::{GeminiFcError, Result};
use crate::models::Session;

/// Process-local session store bounded by age and by entry count.
///
/// Entries older than `ttl_minutes` are treated as absent. When a save pushes
/// the store past `max_sessions`, the least recently updated entries go first.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl_minutes: i64,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl_minutes: i64, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl_minutes,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.ttl_minutes, settings.max_sessions)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| GeminiFcError::SessionError("session store lock poisoned".to_string()))
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.age_minutes(Local::now()) >= self.ttl_minutes
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::from_settings(&SessionSettings::default())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, conversation_id: &str) -> Result<Option<Session>> {
        let mut sessions = self.lock()?;
        let expired = match sessions.get(conversation_id) {
            Some(session) => self.is_expired(session),
            None => return Ok(None),
        };
        if expired {
            debug!(conversation_id, "session expired");
            sessions.remove(conversation_id);
            return Ok(None);
        }
        Ok(sessions.get(conversation_id).cloned())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.lock()?;
        sessions.insert(session.conversation_id.clone(), session.clone());

        sessions.retain(|_, s| !self.is_expired(s));

        while sessions.len() > self.max_sessions {
            let oldest = sessions
                .values()
                .filter(|s| s.conversation_id != session.conversation_id)
                .min_by_key(|s| s.last_updated)
                .map(|s| s.conversation_id.clone());
            match oldest {
                Some(id) => {
                    debug!(conversation_id = %id, "evicting session");
                    sessions.remove(&id);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn remove(&self, conversation_id: &str) -> Result<()> {
        self.lock()?.remove(conversation_id);
        Ok(())
    }

    fn find_recent(&self) -> Result<Option<Session>> {
        let sessions = self.lock()?;
        Ok(sessions
            .values()
            .filter(|s| !self.is_expired(s))
            .max_by_key(|s| s.last_updated)
            .cloned())
    }

    fn clear_all(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Content;

    fn session(id: &str, age_minutes: i64) -> Session {
        Session {
            conversation_id: id.to_string(),
            last_updated: Local::now() - chrono::Duration::minutes(age_minutes),
            history: vec![Content::user_text("hi")],
        }
    }

    #[test]
    fn expired_entries_are_missing() {
        let store = InMemorySessionStore::new(30, 10);
        store.save(&session("fresh", 0)).unwrap();
        store.save(&session("stale", 45)).unwrap();
        assert!(store.get("fresh").unwrap().is_some());
        assert!(store.get("stale").unwrap().is_none());
    }

    #[test]
    fn evicts_least_recently_updated() {
        let store = InMemorySessionStore::new(30, 2);
        store.save(&session("a", 5)).unwrap();
        store.save(&session("b", 3)).unwrap();
        store.save(&session("c", 0)).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("a").unwrap().is_none());
        assert!(store.get("b").unwrap().is_some());
        assert!(store.get("c").unwrap().is_some());
    }

    #[test]
    fn len_counts_entries_after_a_poisoned_lock() {
        let store = std::sync::Arc::new(InMemorySessionStore::new(30, 10));
        store.save(&session("a", 0)).unwrap();

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _held = poisoner.sessions.lock().unwrap();
            panic!("poison the store");
        })
        .join();

        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(matches!(store.get("a"), Err(GeminiFcError::SessionError(_))));
    }
}
