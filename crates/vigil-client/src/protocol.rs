//! Wire protocol for the REST endpoints.

use serde::{Deserialize, Serialize};
use vigil_core::{AuthGrant, User};

/// Body of `GET /auth/setup-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupStatusResponse {
    pub needs_setup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
}

/// Body of `POST /auth/setup` and `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful setup, register or login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl From<AuthResponse> for AuthGrant {
    fn from(response: AuthResponse) -> Self {
        Self {
            user: response.user,
            token: response.token,
        }
    }
}

/// Error payload attached to non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_register_request_shape() {
        let body = RegisterRequest {
            username: "admin",
            email: "admin@example.com",
            password: "hunter22",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "username": "admin", "email": "admin@example.com", "password": "hunter22" })
        );
    }

    #[test]
    fn test_setup_status_without_user_count() {
        let parsed: SetupStatusResponse =
            serde_json::from_value(json!({ "needs_setup": true })).unwrap();
        assert!(parsed.needs_setup);
        assert_eq!(parsed.user_count, None);
    }

    #[test]
    fn test_auth_response_into_grant() {
        let parsed: AuthResponse = serde_json::from_value(json!({
            "token": "abc",
            "user": { "id": 1, "username": "admin", "role": "admin" }
        }))
        .unwrap();

        let grant = AuthGrant::from(parsed);
        assert_eq!(grant.token, "abc");
        assert_eq!(grant.user.username, "admin");
    }

    #[test]
    fn test_error_body_tolerates_other_shapes() {
        let parsed: ErrorBody = serde_json::from_value(json!({ "message": "nope" })).unwrap();
        assert_eq!(parsed.error, None);
    }
}
