//! Monitor collection store.

use std::collections::HashSet;

use tokio::sync::broadcast;
use vigil_core::{ApiError, Monitor, MonitorApi, MonitorDraft, MonitorId, Store};

/// Reactive, ordered cache of monitor records.
///
/// The collection only changes after the server confirms a mutation; a
/// failed request leaves it exactly as it was and hands the error back to
/// the caller. It is a best-effort mirror and never authoritative.
///
/// Concurrent mutations are not serialized: each one applies its effect
/// when its own request resolves, so records created concurrently are
/// appended in resolution order.
pub struct MonitorStore<A>
where
    A: MonitorApi,
{
    api: A,
    monitors: Store<Vec<Monitor>>,
}

impl<A> MonitorStore<A>
where
    A: MonitorApi,
{
    /// Create an empty store backed by `api`.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            monitors: Store::default(),
        }
    }

    /// Snapshot of the collection.
    #[must_use]
    pub fn monitors(&self) -> Vec<Monitor> {
        self.monitors.get()
    }

    /// Look up a cached record.
    #[must_use]
    pub fn find(&self, id: MonitorId) -> Option<Monitor> {
        self.monitors
            .with(|list| list.iter().find(|m| m.id == id).cloned())
    }

    /// Get a receiver for live changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Monitor>> {
        self.monitors.subscribe()
    }

    /// Stream of the current collection followed by every change.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, Vec<Monitor>> {
        self.monitors.stream()
    }

    /// Replace the collection with the server listing, in server order.
    ///
    /// # Errors
    /// Returns the API error; the collection is left unchanged.
    pub async fn fetch_all(&self) -> Result<Vec<Monitor>, ApiError> {
        let mut listing = self.api.list().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch monitors");
        })?;

        let mut seen = HashSet::with_capacity(listing.len());
        let before = listing.len();
        listing.retain(|m| seen.insert(m.id));
        if listing.len() != before {
            tracing::warn!(
                dropped = before - listing.len(),
                "Server listing contained duplicate monitor ids"
            );
        }

        tracing::debug!(count = listing.len(), "Fetched monitors");
        self.monitors.set(listing.clone());
        Ok(listing)
    }

    /// Create a monitor and append the stored record once confirmed.
    ///
    /// # Errors
    /// Returns the API error; the collection is left unchanged.
    pub async fn create(&self, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        let created = self.api.create(draft).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to create monitor");
        })?;

        tracing::debug!(id = %created.id, "Monitor created");
        self.monitors.update(|list| {
            // Keep ids unique if a refresh already brought this record in.
            list.retain(|m| m.id != created.id);
            list.push(created.clone());
        });
        Ok(created)
    }

    /// Update a monitor and replace the cached record once confirmed.
    ///
    /// # Errors
    /// Returns the API error; the collection is left unchanged.
    pub async fn update(&self, id: MonitorId, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        let updated = self.api.update(id, draft).await.inspect_err(|e| {
            tracing::warn!(%id, error = %e, "Failed to update monitor");
        })?;

        tracing::debug!(%id, "Monitor updated");
        self.monitors.update(|list| {
            if let Some(slot) = list.iter_mut().find(|m| m.id == updated.id) {
                *slot = updated.clone();
            } else {
                list.push(updated.clone());
            }
        });
        Ok(updated)
    }

    /// Delete a monitor and drop it from the cache once confirmed.
    ///
    /// # Errors
    /// Returns the API error; the collection is left unchanged.
    pub async fn delete(&self, id: MonitorId) -> Result<(), ApiError> {
        self.api.delete(id).await.inspect_err(|e| {
            tracing::warn!(%id, error = %e, "Failed to delete monitor");
        })?;

        tracing::debug!(%id, "Monitor deleted");
        self.monitors.update_if(|list| {
            let before = list.len();
            list.retain(|m| m.id != id);
            list.len() != before
        });
        Ok(())
    }
}
