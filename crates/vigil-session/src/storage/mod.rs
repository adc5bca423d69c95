//! Storage implementations.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "file")]
pub mod file;

pub mod noop;

#[cfg(feature = "memory")]
pub use memory::MemoryStorage;

#[cfg(feature = "file")]
pub use file::FileStorage;

pub use noop::NoopStorage;
