//! Persistent Data
//!
//! Key/value storage for values that must survive between the login redirect
//! and the callback, such as the CSRF `state`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{ConfigurationError, SdkError};

/// Persistent data interface (for dependency injection).
pub trait PersistentDataStore: Send + Sync {
    /// Get a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value; `None` removes it.
    fn set(&self, key: &str, value: Option<String>);
}

/// In-memory persistent data implementation.
#[derive(Default)]
pub struct InMemoryPersistentDataStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryPersistentDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentDataStore for InMemoryPersistentDataStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<String>) {
        let mut values = self.values.lock().unwrap();
        match value {
            Some(value) => {
                values.insert(key.to_string(), value);
            }
            None => {
                values.remove(key);
            }
        }
    }
}

/// Selects a persistent data implementation.
#[derive(Clone, Default)]
pub enum PersistentDataHandler {
    /// Process-local memory.
    #[default]
    Memory,
    /// Caller-supplied implementation.
    Custom(Arc<dyn PersistentDataStore>),
}

impl PersistentDataHandler {
    /// Select a handler by name.
    pub fn from_name(name: &str) -> Result<Self, SdkError> {
        match name {
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigurationError::UnknownPersistentDataHandler {
                name: name.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for PersistentDataHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "Memory"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Create the persistent data store for a handler.
pub fn create_persistent_data_store(handler: &PersistentDataHandler) -> Arc<dyn PersistentDataStore> {
    match handler {
        PersistentDataHandler::Memory => Arc::new(InMemoryPersistentDataStore::new()),
        PersistentDataHandler::Custom(store) => Arc::clone(store),
    }
}
