//! REST client over `reqwest`.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use vigil_core::{
    ApiError, AuthGrant, ClientConfig, Monitor, MonitorApi, MonitorDraft, MonitorId, SessionApi,
    SessionState, Store, User,
};

use crate::protocol::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest, SetupStatusResponse};

/// Client construction error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// HTTP client for the session and monitor endpoints.
///
/// Each call issues exactly one request and maps the outcome to
/// [`ApiError`]: non-2xx responses become `Rejected` (or `InvalidToken` for
/// the profile check), network and decoding failures become `Transport`.
/// Nothing is retried.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    session: Option<Arc<Store<SessionState>>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("api_prefix", &self.config.api_prefix)
            .field("authenticated_monitors", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            config,
            session: None,
        })
    }

    /// Attach the bearer token of `session` to monitor requests whenever
    /// the session is authenticated.
    #[must_use]
    pub fn with_session(mut self, session: Arc<Store<SessionState>>) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .as_ref()
            .and_then(|session| session.with(|state| state.token().map(str::to_owned)));

        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(rejection(response).await)
        }
    }

    async fn auth_request<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthGrant, ApiError> {
        let url = self.url(path);
        tracing::debug!(target: "vigil.client", %url, "POST");

        let response = self.send(self.client.post(&url).json(body)).await?;
        let parsed: AuthResponse = decode(response).await?;
        Ok(parsed.into())
    }
}

/// Map a non-2xx response to `Rejected`, keeping the server's message.
async fn rejection(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);

    tracing::debug!(target: "vigil.client", status, ?message, "Request rejected");
    ApiError::Rejected { status, message }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json().await.map_err(transport)
}

fn transport(e: reqwest::Error) -> ApiError {
    tracing::warn!(target: "vigil.client", error = %e, "Transport failure");
    ApiError::Transport(e.to_string())
}

#[async_trait]
impl SessionApi for HttpClient {
    async fn setup_status(&self) -> Result<bool, ApiError> {
        let url = self.url("/auth/setup-status");
        tracing::debug!(target: "vigil.client", %url, "GET");

        let response = self.send(self.client.get(&url)).await?;
        let parsed: SetupStatusResponse = decode(response).await?;
        Ok(parsed.needs_setup)
    }

    async fn setup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError> {
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        self.auth_request("/auth/setup", &body).await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError> {
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        self.auth_request("/auth/register", &body).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let body = LoginRequest { username, password };
        self.auth_request("/auth/login", &body).await
    }

    async fn profile(&self, token: &str) -> Result<User, ApiError> {
        let url = self.url("/auth/profile");
        tracing::debug!(target: "vigil.client", %url, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            tracing::debug!(
                target: "vigil.client",
                status = response.status().as_u16(),
                "Token refused"
            );
            return Err(ApiError::InvalidToken);
        }

        decode(response).await
    }
}

#[async_trait]
impl MonitorApi for HttpClient {
    async fn list(&self) -> Result<Vec<Monitor>, ApiError> {
        let url = self.url("/monitors");
        tracing::debug!(target: "vigil.client", %url, "GET");

        let response = self.send(self.authorize(self.client.get(&url))).await?;
        decode(response).await
    }

    async fn create(&self, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        let url = self.url("/monitors");
        tracing::debug!(target: "vigil.client", %url, "POST");

        let request = self.authorize(self.client.post(&url).json(draft));
        let response = self.send(request).await?;
        decode(response).await
    }

    async fn update(&self, id: MonitorId, draft: &MonitorDraft) -> Result<Monitor, ApiError> {
        let url = self.url(&format!("/monitors/{id}"));
        tracing::debug!(target: "vigil.client", %url, "PUT");

        let request = self.authorize(self.client.put(&url).json(draft));
        let response = self.send(request).await?;
        decode(response).await
    }

    async fn delete(&self, id: MonitorId) -> Result<(), ApiError> {
        let url = self.url(&format!("/monitors/{id}"));
        tracing::debug!(target: "vigil.client", %url, "DELETE");

        self.send(self.authorize(self.client.delete(&url))).await?;
        Ok(())
    }
}
