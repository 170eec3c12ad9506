//! Login flow orchestration
//!
//! Owns the session lifecycle: callback listener, browser hand-off, timeout,
//! and cancellation, all funnelled into an exactly-once pending result.

use crate::browser::UrlOpener;
use crate::callback_server::{self, CallbackContext};
use crate::endpoints::Endpoints;
use crate::pkce::{PkcePair, CHALLENGE_METHOD};
use crate::session::SessionShared;
use crate::token_exchange::TokenExchanger;
use crate::types::{AuthConfig, GrantKind, SessionId};
use ca_types::{AccountProfile, AuthError, AuthResult, TokenSet};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Orchestrates browser logins and refresh exchanges for one app
/// registration.
///
/// Each [`authenticate`](Authenticator::authenticate) call runs one
/// independent session: fresh PKCE pair, its own listener, its own timer.
pub struct Authenticator {
    config: AuthConfig,
    exchanger: Arc<TokenExchanger>,
}

impl Authenticator {
    /// Create an authenticator against the production endpoints
    pub fn new(config: AuthConfig) -> Self {
        Self::with_endpoints(config, Endpoints::default())
    }

    /// Create an authenticator against a custom endpoint set (tests)
    pub fn with_endpoints(config: AuthConfig, endpoints: Endpoints) -> Self {
        Self {
            config,
            exchanger: Arc::new(TokenExchanger::with_endpoints(endpoints)),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Start a browser login.
    ///
    /// Binds the callback listener (a port conflict fails here, before any
    /// browser opens), hands the authorization URL to `opener`, arms the
    /// login timeout, and returns the pending result. Whichever of redirect,
    /// timeout, or [`CancelHandle::cancel`] settles first wins; the listener
    /// and timer are torn down on every settle path.
    pub async fn authenticate(&self, opener: &dyn UrlOpener) -> AuthResult<PendingLogin> {
        let session_id = SessionId::new();
        info!("Starting login session {}", session_id);

        // PKCE material lives for the whole session and is never regenerated.
        let pkce = match &self.config.grant {
            GrantKind::AuthorizationCodePkce => Some(PkcePair::generate()),
            GrantKind::ClientSecret { .. } => None,
        };

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Arc::new(SessionShared::new(session_id, result_tx, shutdown_tx));

        let ctx = Arc::new(CallbackContext {
            session: Arc::clone(&session),
            exchanger: Arc::clone(&self.exchanger),
            config: self.config.clone(),
            code_verifier: pkce.as_ref().map(|p| p.code_verifier.clone()),
        });

        // Bind before anything else; a port in use must fail the attempt
        // without a browser window.
        callback_server::start(ctx, shutdown_rx).await?;

        let auth_url = self.authorization_url(pkce.as_ref());
        debug!("Session {}: authorization URL built", session_id);

        if let Err(e) = opener.open_url(&auth_url) {
            error!("Session {}: failed to open authorization page: {}", session_id, e);
            session.stop_listener();
            return Err(e);
        }

        // Timer races the listener; whichever settles first wins.
        let timer_session = Arc::clone(&session);
        let timeout = self.config.login_timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if timer_session.finish(Err(AuthError::Timeout)) {
                warn!(
                    "Login session {} timed out after {:?}",
                    timer_session.id(),
                    timeout
                );
            }
        });
        session.arm_timer(timer);

        Ok(PendingLogin { result_rx, session })
    }

    /// Re-login with a stored refresh token.
    ///
    /// The Minecraft token is short-lived, so the refresh output always
    /// re-runs the downstream hops; no listener or browser is involved.
    pub async fn refresh_login(&self, refresh_token: &str) -> AuthResult<AccountProfile> {
        info!("Refreshing login");

        let chain = async {
            let first = self
                .exchanger
                .exchange_refresh(&self.config, refresh_token)
                .await?;
            self.exchanger.complete_login(first).await
        };

        match tokio::time::timeout(self.config.refresh_timeout, chain).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Refresh only the Microsoft token set, skipping the downstream hops.
    ///
    /// For callers that manage the service token themselves; everyone else
    /// wants [`refresh_login`](Authenticator::refresh_login).
    pub async fn refresh_tokens(&self, refresh_token: &str) -> AuthResult<TokenSet> {
        let exchange = self.exchanger.exchange_refresh(&self.config, refresh_token);
        match tokio::time::timeout(self.config.refresh_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Build the provider authorization URL for this configuration.
    fn authorization_url(&self, pkce: Option<&PkcePair>) -> String {
        let mut url = format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query",
            self.exchanger.endpoints().authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri()),
        );

        if !self.config.scopes.is_empty() {
            let scopes = self.config.scopes.join(" ");
            url.push_str(&format!("&scope={}", urlencoding::encode(&scopes)));
        }

        if let Some(pkce) = pkce {
            url.push_str(&format!(
                "&code_challenge={}&code_challenge_method={}",
                urlencoding::encode(&pkce.code_challenge),
                CHALLENGE_METHOD
            ));
        }

        if self.config.prompt_select_account {
            url.push_str("&prompt=select_account");
        }

        url
    }
}

/// Pending result of a started login session.
///
/// Observable from any task; resolves when the redirect handler, the
/// timeout, or a cancellation settles the session.
#[derive(Debug)]
pub struct PendingLogin {
    result_rx: oneshot::Receiver<AuthResult<AccountProfile>>,
    session: Arc<SessionShared>,
}

impl PendingLogin {
    /// Wait for the session to settle.
    pub async fn wait(self) -> AuthResult<AccountProfile> {
        match self.result_rx.await {
            Ok(result) => result,
            // Sender dropped without settling; treat as cancellation
            Err(_) => Err(AuthError::Cancelled),
        }
    }

    /// Cancel this session. No-op once settled.
    pub fn cancel(&self) {
        CancelHandle {
            session: Arc::clone(&self.session),
        }
        .cancel();
    }

    /// A cloneable handle for cancelling from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            session: Arc::clone(&self.session),
        }
    }
}

/// Cancels a pending login session.
///
/// Safe to call from any task, concurrently with an in-flight redirect, and
/// any number of times; only the first effective settlement wins. The
/// listener socket is signalled to close immediately; if a redirect is being
/// handled at that moment the socket lingers until that handler finishes,
/// bounded by the exchange client's request timeouts.
#[derive(Clone)]
pub struct CancelHandle {
    session: Arc<SessionShared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.session.finish(Err(AuthError::Cancelled)) {
            info!("Login session {} cancelled", self.session.id());
        }
    }
}
