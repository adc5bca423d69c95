//! Core abstractions for the Vigil dashboard client state layer.
//!
//! This crate provides the fundamental building blocks:
//! - `Store` - Reactive container that publishes every committed change
//! - `SessionState`, `User`, `Monitor` - Records mirrored from the server
//! - `ClientConfig` - Endpoint and storage-key configuration
//! - Storage and remote API traits

pub mod config;
pub mod model;
pub mod store;
pub mod traits;

pub use config::ClientConfig;
pub use model::{
    AuthOutcome, Monitor, MonitorDraft, MonitorId, SessionPhase, SessionState, SetupStatus, User,
};
pub use store::Store;
pub use traits::{ApiError, AuthGrant, KeyValueStorage, MonitorApi, SessionApi, StorageError};
