use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Session;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// On-disk form. Both fields are written together; a record missing either
/// one is treated as absent, since they are only ever read as a pair.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: Option<String>,
    email: Option<String>,
}

/// Persistent storage for the session token and user email.
///
/// A single JSON file stands in for the key-value store: writing both keys
/// is one file write, which is as atomic as the contract requires. An
/// unavailable or corrupt store reads as empty.
pub struct TokenStore {
    data_dir: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Persist token and email together
    pub fn save(&self, token: &str, email: &str) -> Result<()> {
        let stored = StoredSession {
            token: Some(token.to_string()),
            email: Some(email.to_string()),
        };
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load the persisted session, or `None` if either value is missing or
    /// the store is unreadable
    pub fn load(&self) -> Option<Session> {
        let path = self.session_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No stored session");
                return None;
            }
        };
        let stored: StoredSession = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Stored session unparsable, treating as empty");
                return None;
            }
        };
        match (stored.token, stored.email) {
            (Some(token), Some(email)) => Some(Session { token, email }),
            _ => None,
        }
    }

    /// Remove the persisted session. A no-op when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_empty_store() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().to_path_buf());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().to_path_buf());
        store.save("T", "a@b.com").expect("save");

        let session = store.load().expect("session present");
        assert_eq!(session.token, "T");
        assert_eq!(session.email, "a@b.com");
    }

    #[test]
    fn test_clear_removes_session_and_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().to_path_buf());
        store.save("T", "a@b.com").expect("save");

        store.clear().expect("clear");
        assert!(store.load().is_none());
        // Clearing an already-empty store is fine
        store.clear().expect("clear again");
    }

    #[test]
    fn test_partial_record_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("session.json"), r#"{"token": "T"}"#).expect("write");
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_store_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("session.json"), "{not json").expect("write");
        assert!(store.load().is_none());
    }
}
