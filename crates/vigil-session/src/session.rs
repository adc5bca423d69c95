//! Session store: the authentication state machine.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use vigil_core::{
    ApiError, AuthGrant, AuthOutcome, SessionApi, SessionState, SetupStatus, Store,
};

use crate::CredentialStore;

/// Message returned when the server could not be reached.
pub const CONNECTION_ERROR: &str = "Connection error";

/// Reactive session store.
///
/// Holds the [`SessionState`] mirror, drives the remote session endpoints
/// through `A`, and keeps the persisted token in step with successful
/// authentications. Every failure is converted to the operation's return
/// value; nothing is retried.
///
/// Operations are not serialized against each other and are never
/// cancelled: a request that resolves after [`SessionStore::logout`] still
/// applies its effect.
pub struct SessionStore<A>
where
    A: SessionApi,
{
    api: A,
    credentials: CredentialStore,
    state: Arc<Store<SessionState>>,
    setup_status: Mutex<SetupStatus>,
}

impl<A> SessionStore<A>
where
    A: SessionApi,
{
    /// Create a session store in the initial anonymous state.
    #[must_use]
    pub fn new(api: A, credentials: CredentialStore) -> Self {
        Self {
            api,
            credentials,
            state: Arc::new(Store::default()),
            setup_status: Mutex::new(SetupStatus::Unknown),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Shared handle to the reactive state, for collaborators that need to
    /// read the token (e.g. an authenticated HTTP client).
    #[must_use]
    pub fn state_handle(&self) -> Arc<Store<SessionState>> {
        Arc::clone(&self.state)
    }

    /// Get a receiver for live state changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Stream of the current state followed by every change.
    #[must_use]
    pub fn stream(&self) -> futures::stream::BoxStream<'static, SessionState> {
        self.state.stream()
    }

    /// Token of the current session, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.with(|s| s.token().map(str::to_owned))
    }

    /// Outcome of the most recent setup-status check; `Unknown` before the
    /// first one.
    #[must_use]
    pub fn last_setup_status(&self) -> SetupStatus {
        *self
            .setup_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the server whether a privileged account must be created first.
    ///
    /// On success `needs_setup` is updated and subscribers are notified. On
    /// any failure the state is left alone and `Unknown` is returned.
    pub async fn check_setup_status(&self) -> SetupStatus {
        let status = match self.api.setup_status().await {
            Ok(needs_setup) => {
                self.state.update(|s| s.set_needs_setup(needs_setup));
                SetupStatus::from(needs_setup)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Setup status check failed");
                SetupStatus::Unknown
            }
        };

        *self
            .setup_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    /// Create the first (privileged) account and sign in as it.
    pub async fn setup(&self, username: &str, email: &str, password: &str) -> AuthOutcome {
        let result = self.api.setup(username, email, password).await;
        self.settle("setup", result, "Setup failed")
    }

    /// Create a regular account and sign in as it.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AuthOutcome {
        let result = self.api.register(username, email, password).await;
        self.settle("register", result, "Registration failed")
    }

    /// Sign in with a username and password.
    ///
    /// Unlike [`setup`](Self::setup) and [`register`](Self::register), the
    /// reason for a failure is not returned.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.api.login(username, password).await {
            Ok(grant) => {
                self.commit("login", grant);
                true
            }
            Err(e) => {
                tracing::warn!(username, error = %e, "Login failed");
                false
            }
        }
    }

    /// Forget the session: clear the persisted token and reset the state.
    pub fn logout(&self) {
        self.credentials.clear();
        self.state.set(SessionState::default());
        tracing::info!("Logged out");
    }

    /// Restore a session from the persisted token.
    ///
    /// Without a token this returns `false` immediately, without touching
    /// the network. A token the server refuses is deleted; the in-memory
    /// state is left as it was. A transport failure leaves both untouched.
    pub async fn check_auth(&self) -> bool {
        let Some(token) = self.credentials.get() else {
            tracing::debug!("No persisted token");
            return false;
        };

        match self.api.profile(&token).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Session restored");
                self.state.set(SessionState::authenticated(user, token));
                true
            }
            Err(ApiError::Transport(detail)) => {
                tracing::warn!(%detail, "Could not verify persisted token");
                false
            }
            Err(e) => {
                tracing::info!(error = %e, "Persisted token refused, removing it");
                self.credentials.clear();
                false
            }
        }
    }

    fn commit(&self, operation: &'static str, grant: AuthGrant) {
        tracing::info!(operation, username = %grant.user.username, "Authenticated");
        self.credentials.set(&grant.token);
        self.state
            .set(SessionState::authenticated(grant.user, grant.token));
    }

    fn settle(
        &self,
        operation: &'static str,
        result: Result<AuthGrant, ApiError>,
        fallback: &str,
    ) -> AuthOutcome {
        match result {
            Ok(grant) => {
                self.commit(operation, grant);
                AuthOutcome::success()
            }
            Err(ApiError::Transport(detail)) => {
                tracing::warn!(operation, %detail, "Request failed");
                AuthOutcome::failure(CONNECTION_ERROR)
            }
            Err(e) => {
                tracing::info!(operation, error = %e, "Request rejected");
                AuthOutcome::failure(e.server_message().unwrap_or(fallback))
            }
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot;
    use vigil_core::{KeyValueStorage, SessionPhase, User, config::TOKEN_KEY};

    use super::*;
    use crate::storage::MemoryStorage;

    fn grant(token: &str) -> AuthGrant {
        AuthGrant {
            user: User::new(1, "admin"),
            token: token.to_string(),
        }
    }

    fn refused(message: &str) -> ApiError {
        ApiError::Rejected {
            status: 400,
            message: Some(message.to_string()),
        }
    }

    fn offline() -> ApiError {
        ApiError::Transport("connection refused".to_string())
    }

    struct FakeApi {
        setup_status: Result<bool, ApiError>,
        auth: Result<AuthGrant, ApiError>,
        profile: Result<User, ApiError>,
        login_gate: Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl Default for FakeApi {
        fn default() -> Self {
            Self {
                setup_status: Err(offline()),
                auth: Err(offline()),
                profile: Err(offline()),
                login_gate: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FakeApi {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionApi for FakeApi {
        async fn setup_status(&self) -> Result<bool, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.setup_status.clone()
        }

        async fn setup(&self, _: &str, _: &str, _: &str) -> Result<AuthGrant, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.auth.clone()
        }

        async fn register(&self, _: &str, _: &str, _: &str) -> Result<AuthGrant, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.auth.clone()
        }

        async fn login(&self, _: &str, _: &str) -> Result<AuthGrant, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.login_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.auth.clone()
        }

        async fn profile(&self, _token: &str) -> Result<User, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profile.clone()
        }
    }

    fn build(api: FakeApi) -> (SessionStore<Arc<FakeApi>>, Arc<FakeApi>, Arc<MemoryStorage>) {
        build_with_storage(api, MemoryStorage::new())
    }

    fn build_with_storage(
        api: FakeApi,
        storage: MemoryStorage,
    ) -> (SessionStore<Arc<FakeApi>>, Arc<FakeApi>, Arc<MemoryStorage>) {
        let api = Arc::new(api);
        let storage = Arc::new(storage);
        let store = SessionStore::new(Arc::clone(&api), CredentialStore::new(storage.clone()));
        (store, api, storage)
    }

    #[tokio::test]
    async fn test_setup_status_needed() {
        let (store, _, _) = build(FakeApi {
            setup_status: Ok(true),
            ..FakeApi::default()
        });
        let mut rx = store.subscribe();

        assert_eq!(store.check_setup_status().await, SetupStatus::Needed);
        assert!(store.state().needs_setup());
        assert_eq!(store.state().phase(), SessionPhase::SetupRequired);
        assert!(rx.try_recv().unwrap().needs_setup());
        assert_eq!(store.last_setup_status(), SetupStatus::Needed);
    }

    #[tokio::test]
    async fn test_setup_status_failure_is_unknown_and_silent() {
        let (store, _, _) = build(FakeApi::default());
        let mut rx = store.subscribe();

        let status = store.check_setup_status().await;

        assert_eq!(status, SetupStatus::Unknown);
        assert!(!status.needs_setup());
        assert_eq!(store.state(), SessionState::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_setup_status_not_needed() {
        let (store, _, _) = build(FakeApi {
            setup_status: Ok(false),
            ..FakeApi::default()
        });

        let status = store.check_setup_status().await;

        assert_eq!(status, SetupStatus::NotNeeded);
        assert!(!store.state().needs_setup());
        assert_eq!(store.state().phase(), SessionPhase::Anonymous);
        assert_eq!(store.last_setup_status(), SetupStatus::NotNeeded);
    }

    #[tokio::test]
    async fn test_setup_status_rejection_is_unknown() {
        let (store, _, _) = build(FakeApi {
            setup_status: Err(ApiError::Rejected {
                status: 500,
                message: None,
            }),
            ..FakeApi::default()
        });
        let mut rx = store.subscribe();

        assert_eq!(store.check_setup_status().await, SetupStatus::Unknown);
        assert_eq!(store.state(), SessionState::default());
        assert_eq!(store.last_setup_status(), SetupStatus::Unknown);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_setup_transport_failure_is_connection_error() {
        let (store, _, storage) = build(FakeApi::default());

        let outcome = store.setup("admin", "admin@example.com", "secret1").await;

        assert_eq!(outcome, AuthOutcome::failure(CONNECTION_ERROR));
        assert_eq!(store.state(), SessionState::default());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_setup_success_authenticates_and_persists() {
        let (store, _, storage) = build(FakeApi {
            setup_status: Ok(true),
            auth: Ok(grant("tok-setup")),
            ..FakeApi::default()
        });
        store.check_setup_status().await;

        let outcome = store.setup("admin", "admin@example.com", "secret1").await;

        assert_eq!(outcome, AuthOutcome::success());
        let state = store.state();
        assert!(state.is_authenticated());
        assert!(!state.needs_setup());
        assert_eq!(state.token(), Some("tok-setup"));
        assert_eq!(
            storage.get(TOKEN_KEY).unwrap().as_deref(),
            state.token()
        );
    }

    #[tokio::test]
    async fn test_setup_rejection_surfaces_server_message() {
        let (store, _, storage) = build(FakeApi {
            auth: Err(refused("Setup already completed. Users already exist.")),
            ..FakeApi::default()
        });

        let outcome = store.setup("admin", "admin@example.com", "secret1").await;

        assert_eq!(
            outcome,
            AuthOutcome::failure("Setup already completed. Users already exist.")
        );
        assert_eq!(store.state(), SessionState::default());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_rejection_without_message_uses_fallback() {
        let (store, _, _) = build(FakeApi {
            auth: Err(ApiError::Rejected {
                status: 500,
                message: None,
            }),
            ..FakeApi::default()
        });

        let outcome = store.register("ops", "ops@example.com", "secret1").await;
        assert_eq!(outcome, AuthOutcome::failure("Registration failed"));
    }

    #[tokio::test]
    async fn test_register_transport_failure_is_connection_error() {
        let (store, _, _) = build(FakeApi::default());

        let outcome = store.register("ops", "ops@example.com", "secret1").await;

        assert_eq!(outcome, AuthOutcome::failure(CONNECTION_ERROR));
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_register_success_round_trips_token() {
        let (store, _, storage) = build(FakeApi {
            auth: Ok(grant("tok-reg")),
            ..FakeApi::default()
        });

        assert!(store.register("ops", "ops@example.com", "secret1").await.success);
        assert_eq!(store.token().as_deref(), Some("tok-reg"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), store.token());
    }

    #[tokio::test]
    async fn test_login_success() {
        let (store, _, storage) = build(FakeApi {
            auth: Ok(grant("tok-login")),
            ..FakeApi::default()
        });
        let mut rx = store.subscribe();

        assert!(store.login("admin", "secret1").await);
        assert_eq!(store.state().phase(), SessionPhase::Authenticated);
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-login"));
        assert!(rx.try_recv().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        for failure in [refused("Invalid credentials"), offline()] {
            let (store, _, _) = build(FakeApi {
                setup_status: Ok(true),
                auth: Err(failure),
                ..FakeApi::default()
            });
            store.check_setup_status().await;
            let before = store.state();
            let mut rx = store.subscribe();

            assert!(!store.login("admin", "wrong").await);
            assert_eq!(store.state(), before);
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_login_hides_error_detail_unlike_register() {
        let (store, _, _) = build(FakeApi {
            auth: Err(refused("Invalid credentials")),
            ..FakeApi::default()
        });

        // login only reports a boolean; register reports the server message.
        let logged_in: bool = store.login("admin", "wrong").await;
        let registered = store.register("admin", "a@example.com", "wrong").await;

        assert!(!logged_in);
        assert_eq!(registered.error.as_deref(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_logout_resets_to_initial_state() {
        let (store, _, storage) = build(FakeApi {
            setup_status: Ok(true),
            auth: Ok(grant("tok")),
            ..FakeApi::default()
        });
        store.check_setup_status().await;
        store.login("admin", "secret1").await;

        store.logout();

        assert_eq!(store.state(), SessionState::default());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_auth_without_token_makes_no_calls() {
        let (store, api, _) = build(FakeApi::default());
        let mut rx = store.subscribe();

        assert!(!store.check_auth().await);
        assert_eq!(api.calls(), 0);
        assert_eq!(store.state(), SessionState::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_check_auth_restores_session() {
        let (store, _, _) = build_with_storage(
            FakeApi {
                profile: Ok(User::new(1, "admin")),
                ..FakeApi::default()
            },
            MemoryStorage::with_entries([(TOKEN_KEY, "tok-saved")]),
        );

        assert!(store.check_auth().await);
        let state = store.state();
        assert!(state.is_authenticated());
        assert!(!state.needs_setup());
        assert_eq!(state.token(), Some("tok-saved"));
        assert_eq!(state.user().map(|u| u.username.as_str()), Some("admin"));
    }

    #[tokio::test]
    async fn test_check_auth_refused_token_is_removed() {
        let (store, _, storage) = build_with_storage(
            FakeApi {
                setup_status: Ok(false),
                profile: Err(ApiError::InvalidToken),
                ..FakeApi::default()
            },
            MemoryStorage::with_entries([(TOKEN_KEY, "tok-stale")]),
        );
        store.check_setup_status().await;
        let before = store.state();

        assert!(!store.check_auth().await);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.state(), before);
    }

    #[tokio::test]
    async fn test_check_auth_refusal_keeps_prior_in_memory_state() {
        let (store, _, storage) = build_with_storage(
            FakeApi {
                auth: Ok(grant("tok-live")),
                profile: Err(ApiError::InvalidToken),
                ..FakeApi::default()
            },
            MemoryStorage::new(),
        );
        assert!(store.login("admin", "secret1").await);

        assert!(!store.check_auth().await);

        // The slot is cleared but the in-memory session is not forcibly reset.
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert!(store.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_check_auth_transport_failure_keeps_token() {
        let (store, api, storage) = build_with_storage(
            FakeApi::default(),
            MemoryStorage::with_entries([(TOKEN_KEY, "tok-saved")]),
        );

        assert!(!store.check_auth().await);
        assert_eq!(api.calls(), 1);
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-saved"));
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_late_login_overwrites_logout() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let (store, api, storage) = build(FakeApi {
            auth: Ok(grant("tok-late")),
            login_gate: Mutex::new(Some(gate_rx)),
            ..FakeApi::default()
        });

        let interleave = async {
            tokio::task::yield_now().await;
            assert_eq!(api.calls(), 1, "login should be in flight");
            store.logout();
            assert_eq!(store.state(), SessionState::default());
            gate_tx.send(()).unwrap();
        };

        let (logged_in, ()) = tokio::join!(store.login("admin", "secret1"), interleave);

        // No cancellation: the login that resolved after logout wins.
        assert!(logged_in);
        assert!(store.state().is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-late"));
    }

    #[tokio::test]
    async fn test_state_handle_shares_updates() {
        let (store, _, _) = build(FakeApi {
            auth: Ok(grant("tok")),
            ..FakeApi::default()
        });
        let handle = store.state_handle();

        store.login("admin", "secret1").await;

        assert_eq!(handle.get().token(), Some("tok"));
    }
}
