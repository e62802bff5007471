//! Persisted auth session.
//!
//! The bearer token lives in one process-wide `SessionState` with an explicit
//! lifecycle: load at startup, set on login/register, clear on logout or 401.
//! The on-disk copy uses atomic write (tmp + rename) to prevent corruption if
//! the process is killed mid-flush.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::model::User;

const SESSION_FILE_ENV: &str = "FETCHBOT_SESSION_FILE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug)]
pub struct SessionState {
    slot: RwLock<Option<Session>>,
    path: PathBuf,
}

impl SessionState {
    /// Loads the persisted session, if any. A missing or unreadable file is
    /// treated as "not logged in", never as an error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slot = read_session(&path);
        Self {
            slot: RwLock::new(slot),
            path,
        }
    }

    /// Default session file location. `FETCHBOT_SESSION_FILE` overrides it,
    /// otherwise the per-user config directory is used.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(SESSION_FILE_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fetchbot")
            .join("session.json")
    }

    /// Stores a new session and persists it. Called on login/register success.
    pub fn set(&self, session: Session) -> io::Result<()> {
        write_session(&self.path, &session)?;
        let mut slot = self.slot.write().expect("session lock poisoned");
        *slot = Some(session);
        Ok(())
    }

    /// Drops the session in memory and on disk. Called on logout and on any
    /// 401 response. Idempotent.
    pub fn clear(&self) {
        let mut slot = self.slot.write().expect("session lock poisoned");
        *slot = None;
        drop(slot);
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("failed to remove session file {:?}: {}", self.path, e);
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        let slot = self.slot.read().expect("session lock poisoned");
        slot.as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        let slot = self.slot.read().expect("session lock poisoned");
        slot.as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        let slot = self.slot.read().expect("session lock poisoned");
        slot.is_some()
    }
}

fn read_session(path: &Path) -> Option<Session> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Atomic write: serialize to .tmp, then rename over the real file.
fn write_session(path: &Path, session: &Session) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(session)?;
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        Session {
            token: "tok-123".to_string(),
            user: User {
                id: 7,
                email: "alice@example.com".to_string(),
                organization_id: Some(3),
            },
        }
    }

    #[test]
    fn test_set_then_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let state = SessionState::load(&path);
        assert!(!state.is_authenticated());

        state.set(sample_session()).unwrap();
        assert_eq!(state.token().as_deref(), Some("tok-123"));

        let reloaded = SessionState::load(&path);
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.user().unwrap().email, "alice@example.com");
    }

    #[test]
    fn test_clear_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let state = SessionState::load(&path);
        state.set(sample_session()).unwrap();
        assert!(path.exists());

        state.clear();
        assert!(!path.exists());
        assert!(!state.is_authenticated());

        state.clear();
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_corrupt_file_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let state = SessionState::load(&path);
        assert!(!state.is_authenticated());
    }
}
