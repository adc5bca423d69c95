//! Session lifecycle, credential persistence and theme preference.
//!
//! Provides:
//! - `SessionStore` - Setup/register/login/logout state machine
//! - `CredentialStore` - The durable bearer-token slot
//! - `ThemeStore` - Durable dark-mode preference
//! - Storage implementations (memory, file, no-op)

pub mod credentials;
pub mod session;
pub mod storage;
pub mod theme;

pub use credentials::CredentialStore;
pub use session::SessionStore;
pub use theme::ThemeStore;
