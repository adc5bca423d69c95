//! Storage for contexts without a durable medium.

use vigil_core::{KeyValueStorage, StorageError};

/// Reads nothing and drops every write.
///
/// Plugging this in keeps store logic identical in environments that
/// cannot persist anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStorage;

impl KeyValueStorage for NoopStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
