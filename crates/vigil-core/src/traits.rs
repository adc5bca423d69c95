//! Core traits for durable storage and remote APIs.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Monitor, MonitorDraft, MonitorId, User};

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt storage document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Durable string slots keyed by well-known names.
///
/// Calls are synchronous; backends are expected to be local (a file, an
/// in-memory map, a browser-style key-value area).
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote API error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is the server's `error` field, if any.
    #[error("Request rejected with status {status}: {}", .message.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, message: Option<String> },
    /// Network or decoding failure.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The bearer token was refused by the profile endpoint.
    #[error("Invalid or expired token")]
    InvalidToken,
}

impl ApiError {
    /// Server-authored message, when the server sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            Self::Transport(_) | Self::InvalidToken => None,
        }
    }
}

/// Credentials returned by a successful setup, register or login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub user: User,
    pub token: String,
}

/// Trait for the remote session endpoints.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Ask whether a privileged account still needs to be created.
    async fn setup_status(&self) -> Result<bool, ApiError>;

    /// Create the first (privileged) account.
    async fn setup(&self, username: &str, email: &str, password: &str)
    -> Result<AuthGrant, ApiError>;

    /// Create a regular account.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError>;

    /// Exchange credentials for a token.
    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError>;

    /// Verify `token` and fetch the user it belongs to.
    ///
    /// A refused token must map to [`ApiError::InvalidToken`].
    async fn profile(&self, token: &str) -> Result<User, ApiError>;
}

/// Trait for the remote monitor collection endpoints.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// List all monitors in server order.
    async fn list(&self) -> Result<Vec<Monitor>, ApiError>;

    /// Create a monitor and return the stored record.
    async fn create(&self, draft: &MonitorDraft) -> Result<Monitor, ApiError>;

    /// Update a monitor and return the stored record.
    async fn update(&self, id: MonitorId, draft: &MonitorDraft) -> Result<Monitor, ApiError>;

    /// Delete a monitor.
    async fn delete(&self, id: MonitorId) -> Result<(), ApiError>;
}

#[async_trait]
impl<T: SessionApi + ?Sized> SessionApi for std::sync::Arc<T> {
    async fn setup_status(&self) -> Result<bool, ApiError> {
        (**self).setup_status().await
    }

    async fn setup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError> {
        (**self).setup(username, email, password).await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError> {
        (**self).register(username, email, password).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        (**self).login(username, password).await
    }

    async fn profile(&self, token: &str) -> Result<User, ApiError> {
        (**self).profile(token).await
    }
}

#[async_trait]
impl<T: MonitorApi + ?Sized> MonitorApi for std::sync::Arc<T> {
    async fn list(&self) -> Result<Vec<Monitor>, ApiError> {
        (**self).list().await
    }

    async fn create(&self, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        (**self).create(draft).await
    }

    async fn update(&self, id: MonitorId, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        (**self).update(id, draft).await
    }

    async fn delete(&self, id: MonitorId) -> Result<(), ApiError> {
        (**self).delete(id).await
    }
}
