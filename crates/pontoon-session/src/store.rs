//! Persistence of the connected identity across restarts
//!
//! Only the address/variant pair is persisted; no remote credential ever
//! is.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use pontoon_core::SignerVariant;

/// The persisted identity pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub address: String,
    pub variant: SignerVariant,
}

/// Where the identity pair is kept between runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<PersistedSession>;
    fn save(&self, session: &PersistedSession) -> io::Result<()>;
    fn clear(&self);
}

/// JSON file-backed store
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Option<PersistedSession> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "discarding unreadable session file: {}", e);
                None
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> io::Result<()> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "failed to clear session file: {}", e),
        }
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.inner.lock().expect("memory store lock poisoned").clone()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<PersistedSession> {
        self.snapshot()
    }

    fn save(&self, session: &PersistedSession) -> io::Result<()> {
        *self.inner.lock().expect("memory store lock poisoned") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.inner.lock().expect("memory store lock poisoned") = None;
    }
}
