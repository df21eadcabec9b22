use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use super::flow::{AuthorizationFlow, AuthorizationOutcome};
use super::grant;
use super::provider::TokenProvider;
use super::store::TokenStore;
use super::token::Token;
use crate::config::ConnectionInfo;
use crate::error::{ApiError, Result, TsheetsError};
use crate::transport::HttpTransport;

/// HTTP status with which the grant endpoint rejects an unknown refresh token.
pub const DEFAULT_REJECTION_STATUS: u16 = 404;

const EVENT_CAPACITY: usize = 16;

/// Lifecycle of a [`ManagedTokenProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No token has ever been installed.
    Unauthenticated,
    /// A token is held; it may still need a refresh on next access.
    Valid,
    /// A refresh-grant call is in flight.
    Refreshing,
    /// The remote rejected the refresh token; the held token was cleared.
    Failed,
}

/// Published every time the held token is replaced.
///
/// `token` is `None` when the token was cleared (refresh rejected or sign-out).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChanged {
    pub token: Option<Token>,
}

/// Token provider that refreshes its token before it goes stale.
///
/// The held token sits behind an async mutex that stays locked for the
/// duration of a refresh, so concurrent callers wait for the in-flight
/// refresh and then observe its result instead of starting their own.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tsheets::auth::{ManagedTokenProvider, Token, TokenProvider};
/// use tsheets::config::ConnectionInfo;
///
/// # async fn example(token: Token) -> tsheets::error::Result<()> {
/// let connection = Arc::new(ConnectionInfo::from_env()?);
/// let provider = ManagedTokenProvider::new(connection).with_token(token);
/// let mut changes = provider.subscribe();
///
/// let access = provider.access_token().await?;
/// if let Ok(event) = changes.try_recv() {
///     println!("token replaced: {:?}", event.token.map(|t| t.expires_in));
/// }
/// # let _ = access;
/// # Ok(())
/// # }
/// ```
pub struct ManagedTokenProvider {
    connection: Arc<ConnectionInfo>,
    transport: HttpTransport,
    token: Mutex<Option<Token>>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<TokenChanged>,
    store: Option<(Arc<dyn TokenStore>, String)>,
    rejection_statuses: Vec<u16>,
}

impl std::fmt::Debug for ManagedTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTokenProvider")
            .field("connection", &self.connection)
            .field("state", &*self.state.borrow())
            .field("store", &self.store.as_ref().map(|(_, profile)| profile))
            .field("rejection_statuses", &self.rejection_statuses)
            .finish_non_exhaustive()
    }
}

impl ManagedTokenProvider {
    pub fn new(connection: Arc<ConnectionInfo>) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connection,
            transport: HttpTransport::new(),
            token: Mutex::new(None),
            state,
            events,
            store: None,
            rejection_statuses: vec![DEFAULT_REJECTION_STATUS],
        }
    }

    /// Seed with a previously obtained token. No notification is published.
    pub fn with_token(mut self, token: Token) -> Self {
        *self.token.get_mut() = Some(token);
        self.state.send_replace(AuthState::Valid);
        self
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Persist every token replacement under `profile`.
    pub fn with_store(mut self, store: Arc<dyn TokenStore>, profile: impl Into<String>) -> Self {
        self.store = Some((store, profile.into()));
        self
    }

    /// HTTP statuses that mean the refresh token itself was rejected.
    pub fn with_rejection_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.rejection_statuses = statuses.into();
        self
    }

    pub fn connection(&self) -> &Arc<ConnectionInfo> {
        &self.connection
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Receive a [`TokenChanged`] event for every token replacement.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenChanged> {
        self.events.subscribe()
    }

    /// Snapshot of the held token.
    pub async fn token(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }

    /// Install a token obtained elsewhere.
    pub async fn set_token(&self, token: Token) {
        let mut held = self.token.lock().await;
        self.replace(&mut held, Some(token), AuthState::Valid, true).await;
    }

    /// Drop the held token and any persisted copy.
    pub async fn sign_out(&self) {
        let mut held = self.token.lock().await;
        self.replace(&mut held, None, AuthState::Unauthenticated, true).await;
    }

    /// Load the persisted token, if a store is configured and holds one.
    pub async fn restore(&self) -> Result<bool> {
        let Some((store, profile)) = &self.store else {
            return Ok(false);
        };
        let profile = profile.clone();
        let Some(token) = on_store(store, move |store| store.load(&profile)).await? else {
            return Ok(false);
        };
        let mut held = self.token.lock().await;
        self.replace(&mut held, Some(token), AuthState::Valid, false).await;
        Ok(true)
    }

    /// Run the interactive authorization-code flow and install the result.
    ///
    /// On denial or abandonment the provider is left untouched.
    pub async fn authenticate(&self, flow: &dyn AuthorizationFlow) -> Result<()> {
        let expected_state = Uuid::new_v4().simple().to_string();
        let url = grant::authorization_url(&self.connection, &expected_state)?;

        match flow
            .authorize(url.as_str(), self.connection.redirect_uri())
            .await?
        {
            AuthorizationOutcome::Granted { code, state } => {
                if state.as_deref() != Some(expected_state.as_str()) {
                    warn!("authorization redirect carried an unexpected state");
                    return Err(TsheetsError::StateMismatch);
                }
                let token =
                    grant::exchange_authorization_code(&self.transport, &self.connection, &code)
                        .await?;
                info!(user_id = %token.user_id, "authenticated");
                let mut held = self.token.lock().await;
                self.replace(&mut held, Some(token), AuthState::Valid, true).await;
                Ok(())
            }
            AuthorizationOutcome::Denied { error, description } => {
                warn!(error = %error, "authorization denied");
                Err(TsheetsError::AuthorizationDenied { error, description })
            }
            AuthorizationOutcome::Abandoned => Err(TsheetsError::AuthorizationAbandoned),
        }
    }

    async fn refresh(
        &self,
        held: &mut MutexGuard<'_, Option<Token>>,
        refresh_token: &str,
    ) -> Result<String> {
        self.state.send_replace(AuthState::Refreshing);
        info!("access token is stale, refreshing");

        match grant::exchange_refresh_token(&self.transport, &self.connection, refresh_token).await
        {
            Ok(token) => {
                let access = token.access_token.clone();
                self.replace(held, Some(token), AuthState::Valid, true).await;
                info!("access token refreshed");
                Ok(access)
            }
            Err(TsheetsError::Api(err)) if self.is_rejection(&err) => {
                warn!(status = %err.http_status_code(), "refresh token rejected, clearing token");
                self.replace(held, None, AuthState::Failed, true).await;
                Err(TsheetsError::RefreshTokenRejected(err))
            }
            Err(err) => {
                // The stale token stays; the next access attempts one more refresh.
                self.state.send_replace(AuthState::Valid);
                Err(err)
            }
        }
    }

    fn is_rejection(&self, err: &ApiError) -> bool {
        err.status()
            .is_some_and(|status| self.rejection_statuses.contains(&status))
    }

    async fn replace(
        &self,
        held: &mut MutexGuard<'_, Option<Token>>,
        token: Option<Token>,
        state: AuthState,
        persist: bool,
    ) {
        **held = token.clone();
        self.state.send_replace(state);
        if persist {
            self.persist(token.clone()).await;
        }
        // No subscribers is fine.
        let _ = self.events.send(TokenChanged { token });
    }

    async fn persist(&self, token: Option<Token>) {
        let Some((store, profile)) = &self.store else {
            return;
        };
        let key = profile.clone();
        let result = on_store(store, move |store| match &token {
            Some(token) => store.save(&key, token),
            None => store.clear(&key),
        })
        .await;
        if let Err(err) = result {
            warn!(error = %err, profile = %profile, "failed to persist token");
        }
    }
}

/// Run a store operation on the blocking pool; stores may do file I/O.
async fn on_store<T, F>(store: &Arc<dyn TokenStore>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn TokenStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&*store))
        .await
        .map_err(|err| TsheetsError::Storage(format!("token store task failed: {err}")))?
}

#[async_trait]
impl TokenProvider for ManagedTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut held = self.token.lock().await;
        let refresh_token = match held.as_ref() {
            None => return Err(TsheetsError::NotAuthenticated),
            Some(token) if !token.is_stale() => return Ok(token.access_token.clone()),
            Some(token) => token.refresh_token.clone(),
        };
        self.refresh(&mut held, &refresh_token).await
    }
}
