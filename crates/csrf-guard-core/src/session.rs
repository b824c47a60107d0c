//! Session store contract and an in-memory implementation

use crate::error::CsrfError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors reported by session backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session data lock was poisoned by a panicking holder.
    #[error("Session lock poisoned: {0}")]
    Poisoned(String),

    /// Backend-specific failure (I/O, serialization, ...).
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Key/value view of one client session.
///
/// The guard reads and writes exactly one key, the configured field name.
/// Persistence and session lifecycle belong to the implementor.
pub trait SessionStore: Send + Sync {
    /// Get a value.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Set a value, replacing any previous one.
    fn set(&self, key: &str, value: String) -> Result<(), SessionError>;

    /// Remove a value, returning it.
    fn remove(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Return the non-empty value stored under `key`, or store and return
    /// the value produced by `init`.
    ///
    /// Implementations must perform the read and the write as one atomic
    /// step so concurrent requests of the same session agree on one value.
    /// `init` is only called when the key is absent or empty.
    fn get_or_insert_with(
        &self,
        key: &str,
        init: &mut dyn FnMut() -> Result<String, CsrfError>,
    ) -> Result<String, CsrfError>;
}

/// In-memory session data.
///
/// Cloning shares the underlying map, so a clone placed in request
/// extensions observes writes made through another clone.
#[derive(Clone, Default)]
pub struct MemorySession {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every value, as when the session is destroyed.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.lock()?.clear();
        Ok(())
    }

    /// Number of stored values.
    pub fn len(&self) -> Result<usize, SessionError> {
        Ok(self.lock()?.len())
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, SessionError> {
        self.values
            .lock()
            .map_err(|e| SessionError::Poisoned(format!("Failed to acquire lock: {}", e)))
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values hold secrets
        f.debug_struct("MemorySession").finish_non_exhaustive()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.lock()?.remove(key))
    }

    fn get_or_insert_with(
        &self,
        key: &str,
        init: &mut dyn FnMut() -> Result<String, CsrfError>,
    ) -> Result<String, CsrfError> {
        let mut values = self.lock()?;

        match values.get(key) {
            Some(existing) if !existing.is_empty() => Ok(existing.clone()),
            _ => {
                let value = init()?;
                values.insert(key.to_string(), value.clone());
                Ok(value)
            }
        }
    }
}

/// Shareable handle to the session of the current request.
///
/// Session middleware inserts this into request extensions; the CSRF layer
/// picks it up from there.
#[derive(Clone)]
pub struct Session(Arc<dyn SessionStore>);

impl Session {
    /// Wrap a session store.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// Wrap an already shared session store.
    pub fn from_arc(store: Arc<dyn SessionStore>) -> Self {
        Self(store)
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &dyn SessionStore {
        self.0.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&"..").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_set_remove() {
        let session = MemorySession::new();
        assert_eq!(session.get("k").unwrap(), None);

        session.set("k", "v".to_string()).unwrap();
        assert_eq!(session.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(session.len().unwrap(), 1);

        assert_eq!(session.remove("k").unwrap().as_deref(), Some("v"));
        assert!(session.is_empty().unwrap());
    }

    #[test]
    fn get_or_insert_keeps_existing_value() {
        let session = MemorySession::new();
        session.set("k", "existing".to_string()).unwrap();

        let mut calls = 0;
        let value = session
            .get_or_insert_with("k", &mut || {
                calls += 1;
                Ok("new".to_string())
            })
            .unwrap();

        assert_eq!(value, "existing");
        assert_eq!(calls, 0);
    }

    #[test]
    fn get_or_insert_replaces_empty_value() {
        let session = MemorySession::new();
        session.set("k", String::new()).unwrap();

        let value = session
            .get_or_insert_with("k", &mut || Ok("fresh".to_string()))
            .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(session.get("k").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn get_or_insert_propagates_init_error() {
        let session = MemorySession::new();
        let result = session.get_or_insert_with("k", &mut || Err(CsrfError::SessionUnavailable));

        assert!(matches!(result, Err(CsrfError::SessionUnavailable)));
        assert_eq!(session.get("k").unwrap(), None);
    }

    #[test]
    fn concurrent_get_or_insert_agrees_on_one_value() {
        let session = MemorySession::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                thread::spawn(move || {
                    session
                        .get_or_insert_with("k", &mut || Ok(format!("value-{}", i)))
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(session.get("k").unwrap(), Some(values[0].clone()));
    }

    #[test]
    fn clones_share_data() {
        let session = MemorySession::new();
        let handle = Session::new(session.clone());

        handle.store().set("k", "v".to_string()).unwrap();
        assert_eq!(session.get("k").unwrap().as_deref(), Some("v"));

        session.clear().unwrap();
        assert_eq!(handle.store().get("k").unwrap(), None);
    }
}
