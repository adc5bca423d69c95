//! Server-confirmed monitor collection store.
//!
//! Provides:
//! - `MonitorStore` - Reactive, ordered cache of monitor records that only
//!   changes after the server confirms a mutation

pub mod store;

pub use store::MonitorStore;
