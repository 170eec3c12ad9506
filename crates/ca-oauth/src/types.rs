//! Core types for the login flow

use std::time::Duration;
use uuid::Uuid;

/// Default timeout for a full browser login (user has to click through the
/// Microsoft consent pages)
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for a refresh exchange (pure server-to-server traffic)
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Unique identifier for a login session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new unique session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which authorization grant the flow uses at the Microsoft token endpoint.
///
/// The two variants are the same flow with different proof material; every
/// downstream hop is identical.
#[derive(Debug, Clone)]
pub enum GrantKind {
    /// Public client: authorization code with PKCE (S256). No client secret.
    AuthorizationCodePkce,

    /// Confidential client: authorization code with a client secret and no
    /// PKCE parameters. Kept for app registrations predating PKCE support.
    ClientSecret {
        /// The registered client secret
        secret: String,
    },
}

impl GrantKind {
    /// Whether this grant sends PKCE parameters
    pub fn uses_pkce(&self) -> bool {
        matches!(self, GrantKind::AuthorizationCodePkce)
    }
}

/// Login flow configuration (input)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Azure application (client) ID
    pub client_id: String,

    /// Authorization grant variant
    pub grant: GrantKind,

    /// Port for the loopback callback server
    pub callback_port: u16,

    /// Path the provider redirects back to, e.g. "/auth"
    pub redirect_path: String,

    /// Requested scopes
    pub scopes: Vec<String>,

    /// Append `prompt=select_account` so the browser shows the account
    /// picker instead of silently reusing the last session
    pub prompt_select_account: bool,

    /// How long to wait for the user to finish the browser login
    pub login_timeout: Duration,

    /// How long a refresh exchange may take end to end
    pub refresh_timeout: Duration,
}

impl AuthConfig {
    /// Creates a configuration with the standard Minecraft scopes and a
    /// PKCE grant.
    pub fn new(client_id: impl Into<String>, callback_port: u16) -> Self {
        Self {
            client_id: client_id.into(),
            grant: GrantKind::AuthorizationCodePkce,
            callback_port,
            redirect_path: "/auth".to_string(),
            scopes: vec!["XboxLive.signin".to_string(), "offline_access".to_string()],
            prompt_select_account: true,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Sets the grant variant.
    #[must_use]
    pub fn with_grant(mut self, grant: GrantKind) -> Self {
        self.grant = grant;
        self
    }

    /// Sets the redirect path the provider calls back on.
    #[must_use]
    pub fn with_redirect_path(mut self, path: impl Into<String>) -> Self {
        self.redirect_path = path.into();
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets whether the authorization URL carries `prompt=select_account`.
    #[must_use]
    pub fn with_prompt_select_account(mut self, enabled: bool) -> Self {
        self.prompt_select_account = enabled;
        self
    }

    /// Sets the browser login timeout.
    #[must_use]
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Sets the refresh exchange timeout.
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// The redirect URI registered with the provider and bound locally.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.callback_port, self.redirect_path)
    }
}
