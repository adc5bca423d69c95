//! Records mirrored from the server.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account record returned by the server.
///
/// Only the identifying fields are typed; everything else the server sends
/// is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Create a user with just an id and a username.
    #[must_use]
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            role: None,
            extra: Map::new(),
        }
    }
}

/// Lifecycle phase derived from a [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No privileged account exists yet.
    SetupRequired,
    /// Setup is done but nobody is signed in.
    Anonymous,
    /// Signed in with a bearer token.
    Authenticated,
}

/// Authentication state held by the session store.
///
/// Fields are private so that an authenticated state always carries a
/// token: the only way to build one is [`SessionState::authenticated`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    is_authenticated: bool,
    user: Option<User>,
    token: Option<String>,
    needs_setup: bool,
}

impl SessionState {
    /// Signed-in state for `user` holding `token`.
    #[must_use]
    pub const fn authenticated(user: User, token: String) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            token: Some(token),
            needs_setup: false,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn needs_setup(&self) -> bool {
        self.needs_setup
    }

    /// Record the server-reported setup flag.
    pub const fn set_needs_setup(&mut self, needs_setup: bool) {
        self.needs_setup = needs_setup;
    }

    /// Which lifecycle phase this state describes.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.is_authenticated {
            SessionPhase::Authenticated
        } else if self.needs_setup {
            SessionPhase::SetupRequired
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// Outcome of a setup-status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    /// The server has no privileged account yet.
    Needed,
    /// Setup already happened.
    NotNeeded,
    /// The server could not be asked.
    Unknown,
}

impl SetupStatus {
    /// Collapse to a boolean, treating `Unknown` as "not needed".
    #[must_use]
    pub const fn needs_setup(self) -> bool {
        matches!(self, Self::Needed)
    }
}

impl From<bool> for SetupStatus {
    fn from(needs_setup: bool) -> Self {
        if needs_setup { Self::Needed } else { Self::NotNeeded }
    }
}

/// Result of `setup` and `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Server-assigned monitor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(pub i64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for MonitorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Monitor record as returned by the server.
///
/// Apart from `id`, attributes are server-defined and kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Monitor {
    /// Create a monitor with no attributes.
    #[must_use]
    pub fn new(id: impl Into<MonitorId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get an attribute by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attribute("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.attribute("url").and_then(Value::as_str)
    }

    /// Latest check status (`up`, `down`, `unknown`) if the server sent one.
    #[must_use]
    pub fn current_status(&self) -> Option<&str> {
        self.attribute("current_status").and_then(Value::as_str)
    }
}

/// Payload for creating or updating a monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Check kind: `http`, `tcp` or `ping`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Seconds between checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Seconds before a check is considered failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl MonitorDraft {
    /// Draft with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, seconds: u32) -> Self {
        self.interval = Some(seconds);
        self
    }
}
