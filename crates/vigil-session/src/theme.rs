//! Durable dark-mode preference.

use std::sync::Arc;

use tokio::sync::broadcast;
use vigil_core::{KeyValueStorage, Store, config::THEME_KEY};

/// Reactive boolean preference persisted as `"true"` / `"false"`.
pub struct ThemeStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    dark_mode: Store<bool>,
}

impl std::fmt::Debug for ThemeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeStore")
            .field("key", &self.key)
            .field("dark_mode", &self.dark_mode.get())
            .finish_non_exhaustive()
    }
}

impl ThemeStore {
    /// Load the preference from `storage` under the default `darkMode` key.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, THEME_KEY)
    }

    /// Load the preference from `storage` under `key`.
    #[must_use]
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = read(storage.as_ref(), &key);
        Self {
            storage,
            key,
            dark_mode: Store::new(initial),
        }
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.dark_mode.get()
    }

    /// Persist and publish `value`.
    pub fn set(&self, value: bool) {
        self.dark_mode.update(|current| {
            self.persist(value);
            *current = value;
        });
    }

    /// Flip the preference, returning the new value.
    pub fn toggle(&self) -> bool {
        self.dark_mode.update(|current| {
            let next = !*current;
            self.persist(next);
            *current = next;
            next
        })
    }

    /// Re-read the stored value and publish it.
    pub fn init(&self) {
        let stored = read(self.storage.as_ref(), &self.key);
        self.dark_mode.set(stored);
    }

    /// Get a receiver for live changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.dark_mode.subscribe()
    }

    fn persist(&self, value: bool) {
        if let Err(e) = self.storage.set(&self.key, if value { "true" } else { "false" }) {
            tracing::warn!(key = %self.key, error = %e, "Failed to persist theme preference");
        }
    }
}

fn read(storage: &dyn KeyValueStorage, key: &str) -> bool {
    match storage.get(key) {
        Ok(value) => value.as_deref() == Some("true"),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read theme preference");
            false
        }
    }
}
