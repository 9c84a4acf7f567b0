use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::errors::ChatError;

/// Maximum session id length accepted by the backend, in characters.
pub const MAX_SESSION_ID_CHARS: usize = 128;

/// Storage key the session id is kept under unless configured otherwise.
pub const DEFAULT_SESSION_KEY: &str = "assistant_ui_session_id";

/// Opaque session token correlating runs to one backend conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw id, truncating it to `MAX_SESSION_ID_CHARS` characters.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        match value.char_indices().nth(MAX_SESSION_ID_CHARS) {
            Some((cut, _)) => Self(value[..cut].to_string()),
            None => Self(value),
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable string key-value store holding the session id.
pub trait SessionStore: Send + Sync {
    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    /// Stores a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
}

/// Process-local store, mainly for tests and embedders without persistence.
#[derive(Default, Debug)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let values = self
            .values
            .lock()
            .map_err(|_| ChatError::Storage("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ChatError::Storage("memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisting all keys as one JSON object in a single file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, ChatError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(ChatError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            ChatError::Storage(format!("invalid store file {}: {e}", self.path.display()))
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ChatError::Storage("file store lock poisoned".into()))?;
        let mut map = self.read_map().unwrap_or_else(|err| {
            warn!(
                path = %self.path.display(),
                error = %err,
                "session store unreadable; rewriting it with only the new key"
            );
            HashMap::new()
        });
        map.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let body = serde_json::to_string_pretty(&map)
            .map_err(|e| ChatError::Storage(format!("failed to encode store: {e}")))?;
        std::fs::write(&self.path, body).map_err(|e| {
            ChatError::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

/// How new session ids are generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionIdStrategy {
    /// Random v4 UUID from the OS random source.
    #[default]
    RandomUuid,
    /// `session-<unix millis>`; lower collision resistance.
    Timestamp,
}

impl SessionIdStrategy {
    fn generate(self) -> String {
        match self {
            Self::RandomUuid => uuid::Uuid::new_v4().to_string(),
            Self::Timestamp => {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                format!("session-{millis}")
            }
        }
    }
}

/// Produces and persists the stable per-profile session id.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Arc<dyn SessionStore>,
    key: String,
    strategy: SessionIdStrategy,
}

impl SessionIdentity {
    /// Creates an identity manager over `store` using the default key.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            key: DEFAULT_SESSION_KEY.to_string(),
            strategy: SessionIdStrategy::default(),
        }
    }

    /// Overrides the storage key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Overrides the id generation strategy.
    pub fn strategy(mut self, strategy: SessionIdStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the stored session id, creating and persisting one on first use.
    ///
    /// Store failures are logged and do not fail the call: an unreadable store
    /// is treated as empty and a failed write still returns the new id.
    pub fn get_or_create_session_id(&self) -> SessionId {
        match self.store.get(&self.key) {
            Ok(Some(existing)) if !existing.is_empty() => return SessionId(existing),
            Ok(_) => {}
            Err(err) => warn!(key = %self.key, error = %err, "session store read failed"),
        }

        let created = self.strategy.generate();
        if let Err(err) = self.store.set(&self.key, &created) {
            warn!(key = %self.key, error = %err, "session store write failed");
        } else {
            debug!(key = %self.key, session_id = %created, "created session id");
        }
        SessionId(created)
    }

    /// Resolves the id for one run: the hint when present, else the stored id,
    /// truncated to `MAX_SESSION_ID_CHARS`. The hint is never persisted.
    pub fn resolve(&self, thread_id_hint: Option<&str>) -> SessionId {
        match thread_id_hint {
            Some(hint) => SessionId::new(hint),
            None => SessionId::new(self.get_or_create_session_id().0),
        }
    }
}
