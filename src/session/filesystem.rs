use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::storage::SessionStore;
use crate::error::{GeminiFcError, Result};
use crate::models::Session;

/// One JSON file per conversation under a cache directory.
pub struct FilesystemSessionStore {
    dir: PathBuf,
    ttl_minutes: i64,
}

impl FilesystemSessionStore {
    pub fn new(dir: impl Into<PathBuf>, ttl_minutes: i64) -> Self {
        Self {
            dir: dir.into(),
            ttl_minutes,
        }
    }

    /// Store rooted at `<cache dir>/gemini-fc`.
    pub fn in_cache_dir(ttl_minutes: i64) -> Result<Self> {
        let dir = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .ok_or_else(|| {
                GeminiFcError::SessionError("Could not determine cache directory".to_string())
            })?
            .join("gemini-fc");
        Ok(Self::new(dir, ttl_minutes))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn session_path(&self, conversation_id: &str) -> Option<PathBuf> {
        // Ids end up in file names
        let valid = !conversation_id.is_empty()
            && conversation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("session-{}.json", conversation_id)))
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.age_minutes(Local::now()) >= self.ttl_minutes
    }

    fn read_all(&self) -> Vec<(PathBuf, Session)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if is_session_file(&path) {
                    let content = fs::read_to_string(&path).ok()?;
                    let session: Session = serde_json::from_str(&content).ok()?;
                    Some((path, session))
                } else {
                    None
                }
            })
            .collect()
    }
}

fn is_session_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("session-"))
}

impl SessionStore for FilesystemSessionStore {
    fn get(&self, conversation_id: &str) -> Result<Option<Session>> {
        let path = match self.session_path(conversation_id) {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        };

        let content = fs::read_to_string(&path)?;
        let session: Session = match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                debug!(conversation_id, "discarding unreadable session: {}", e);
                let _ = fs::remove_file(&path);
                return Ok(None);
            }
        };

        if self.is_expired(&session) {
            let _ = fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.conversation_id).ok_or_else(|| {
            GeminiFcError::SessionError(format!(
                "Invalid conversation id: {}",
                session.conversation_id
            ))
        })?;
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn remove(&self, conversation_id: &str) -> Result<()> {
        if let Some(path) = self.session_path(conversation_id) {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn find_recent(&self) -> Result<Option<Session>> {
        let mut sessions = self.read_all();

        // Sort by last_updated (most recent first)
        sessions.sort_by(|a, b| b.1.last_updated.cmp(&a.1.last_updated));

        let mut recent = None;
        for (path, session) in sessions {
            if self.is_expired(&session) {
                let _ = fs::remove_file(&path);
            } else if recent.is_none() {
                recent = Some(session);
            }
        }
        Ok(recent)
    }

    fn clear_all(&self) -> Result<()> {
        for (path, _) in self.read_all() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
