//! Reactive value container with broadcast fan-out.

use std::sync::{PoisonError, RwLock};

use futures::{StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Number of commits a slow subscriber may fall behind before it skips ahead.
const CHANNEL_CAPACITY: usize = 256;

/// Reactive container holding a single value.
///
/// Every committed change is sent to live subscribers before the mutating
/// call returns. Mutation and publication happen under one write guard, so
/// subscribers observe commits in the order they were applied.
pub struct Store<T> {
    value: RwLock<T>,
    sender: broadcast::Sender<T>,
}

impl<T> Default for Store<T>
where
    T: Clone + Default + Send + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Store<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Store")
            .field("value", &*value)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<T> Store<T>
where
    T: Clone + Send + 'static,
{
    /// Create a store holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            value: RwLock::new(initial),
            sender,
        }
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut guard);
        let _ = self.sender.send(guard.clone()); // no subscribers is fine
        out
    }

    /// Mutate the value in place, notifying subscribers only when `f`
    /// reports a change. Returns what `f` returned.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let changed = f(&mut guard);
        if changed {
            let _ = self.sender.send(guard.clone());
        }
        changed
    }

    /// Get a receiver for live updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream that yields the current value first, then every commit.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, T> {
        // Subscribing under the read guard means no commit can land between
        // the snapshot and the receiver.
        let (current, rx) = {
            let guard = self.value.read().unwrap_or_else(PoisonError::into_inner);
            (guard.clone(), self.sender.subscribe())
        };

        let live = BroadcastStream::new(rx).filter_map(|res| future::ready(res.ok()));

        futures::stream::once(future::ready(current))
            .chain(live)
            .boxed()
    }
}
