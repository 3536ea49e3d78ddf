//! Durable session storage.
//!
//! Sessions live in a key-value store under a fixed key namespace; the
//! absence of a token's key means logged out. The file-backed implementation
//! is the durable store used by the running service; the in-memory one backs
//! tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use super::User;

/// Fixed key namespace for session entries.
pub const SESSION_KEY_PREFIX: &str = "relief:session:";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<User>, SessionStoreError>;
    async fn put(&self, token: &str, user: &User) -> Result<(), SessionStoreError>;
    async fn remove(&self, token: &str) -> Result<(), SessionStoreError>;
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Volatile session store for tests and ephemeral deployments.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, User>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, token: &str) -> Result<Option<User>, SessionStoreError> {
        Ok(self.entries.read().unwrap().get(&session_key(token)).cloned())
    }

    async fn put(&self, token: &str, user: &User) -> Result<(), SessionStoreError> {
        self.entries
            .write()
            .unwrap()
            .insert(session_key(token), user.clone());
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<(), SessionStoreError> {
        self.entries.write().unwrap().remove(&session_key(token));
        Ok(())
    }
}

/// Durable session store: the whole namespace is serialized to a JSON file
/// after every mutation and reloaded on open, so sessions survive restarts.
pub struct FileSessionStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, User>>,
}

impl FileSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionStoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, User>) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, token: &str) -> Result<Option<User>, SessionStoreError> {
        Ok(self.entries.read().unwrap().get(&session_key(token)).cloned())
    }

    async fn put(&self, token: &str, user: &User) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(session_key(token), user.clone());
        self.persist(&entries)
    }

    async fn remove(&self, token: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&session_key(token));
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn manager() -> User {
        User {
            email: "manager@relief.example".into(),
            name: "Amal Haddad".into(),
            role: Role::Administrator,
            storeroom: "STR001".into(),
            committee: None,
        }
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let store = InMemorySessionStore::new();
        assert!(store.get("tok").await.unwrap().is_none());

        store.put("tok", &manager()).await.unwrap();
        let user = store.get("tok").await.unwrap().unwrap();
        assert_eq!(user.email, "manager@relief.example");

        store.remove("tok").await.unwrap();
        assert!(store.get("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        {
            let store = FileSessionStore::open(&path).unwrap();
            store.put("tok", &manager()).await.unwrap();
        }

        let reopened = FileSessionStore::open(&path).unwrap();
        let user = reopened.get("tok").await.unwrap().unwrap();
        assert_eq!(user.name, "Amal Haddad");

        // Entries are stored under the fixed key namespace.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(&format!("{SESSION_KEY_PREFIX}tok")));
    }

    #[tokio::test]
    async fn removing_the_key_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = FileSessionStore::open(&path).unwrap();
        store.put("tok", &manager()).await.unwrap();
        store.remove("tok").await.unwrap();

        let reopened = FileSessionStore::open(&path).unwrap();
        assert!(reopened.get("tok").await.unwrap().is_none());
    }
}
