//! HTTP client for the Vigil session and monitor endpoints.
//!
//! Provides:
//! - Wire protocol (JSON request and response bodies)
//! - `HttpClient`, implementing `SessionApi` and `MonitorApi`

pub mod http;
pub mod protocol;

pub use http::{ClientError, HttpClient};
pub use protocol::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest, SetupStatusResponse};
