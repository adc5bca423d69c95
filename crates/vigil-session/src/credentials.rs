//! The durable bearer-token slot.

use std::sync::Arc;

use vigil_core::{KeyValueStorage, config::TOKEN_KEY};

/// Scoped wrapper around the token slot of a [`KeyValueStorage`].
///
/// Backend failures are logged and swallowed: a failed read looks like an
/// absent token and a failed write leaves the previous value in place.
/// Nothing here is transactional with respect to the session state.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Wrap `storage`, using the default `auth_token` key.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, TOKEN_KEY)
    }

    /// Wrap `storage`, using `key` for the token slot.
    #[must_use]
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The persisted token, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        match self.storage.get(&self.key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read persisted token");
                None
            }
        }
    }

    /// Persist `token`.
    pub fn set(&self, token: &str) {
        if let Err(e) = self.storage.set(&self.key, token) {
            tracing::warn!(key = %self.key, error = %e, "Failed to persist token");
        }
    }

    /// Delete the persisted token.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to clear persisted token");
        }
    }
}
