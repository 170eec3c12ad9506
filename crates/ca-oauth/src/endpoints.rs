//! Fixed service endpoints for the login pipeline
//!
//! The production URLs are deployment constants, not caller configuration.
//! [`Endpoints`] defaults to them; the `with_*` overrides exist so tests can
//! point the exchange client at a mock server.

/// Microsoft consumer-tenant authorization endpoint
pub const MICROSOFT_AUTHORIZE_URL: &str =
    "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";

/// Microsoft consumer-tenant token endpoint
pub const MICROSOFT_TOKEN_URL: &str =
    "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";

/// Xbox Live user authentication endpoint
pub const XBOX_USER_AUTH_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";

/// XSTS authorization endpoint
pub const XSTS_AUTHORIZE_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";

/// Minecraft Services login endpoint
pub const MINECRAFT_LOGIN_URL: &str =
    "https://api.minecraftservices.com/authentication/login_with_xbox";

/// Minecraft Services profile endpoint
pub const MINECRAFT_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";

/// Resolved endpoint set used by the exchange client.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Authorization endpoint the browser is sent to
    pub authorize_url: String,

    /// Token endpoint for the code and refresh exchanges
    pub token_url: String,

    /// Xbox Live user authentication endpoint
    pub xbox_auth_url: String,

    /// XSTS authorization endpoint
    pub xsts_auth_url: String,

    /// Minecraft Services login endpoint
    pub minecraft_login_url: String,

    /// Minecraft Services profile endpoint
    pub minecraft_profile_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: MICROSOFT_AUTHORIZE_URL.to_string(),
            token_url: MICROSOFT_TOKEN_URL.to_string(),
            xbox_auth_url: XBOX_USER_AUTH_URL.to_string(),
            xsts_auth_url: XSTS_AUTHORIZE_URL.to_string(),
            minecraft_login_url: MINECRAFT_LOGIN_URL.to_string(),
            minecraft_profile_url: MINECRAFT_PROFILE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Creates the production endpoint set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom token URL for testing.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets a custom Xbox authentication URL for testing.
    #[must_use]
    pub fn with_xbox_auth_url(mut self, url: impl Into<String>) -> Self {
        self.xbox_auth_url = url.into();
        self
    }

    /// Sets a custom XSTS authorization URL for testing.
    #[must_use]
    pub fn with_xsts_auth_url(mut self, url: impl Into<String>) -> Self {
        self.xsts_auth_url = url.into();
        self
    }

    /// Sets a custom Minecraft login URL for testing.
    #[must_use]
    pub fn with_minecraft_login_url(mut self, url: impl Into<String>) -> Self {
        self.minecraft_login_url = url.into();
        self
    }

    /// Sets a custom Minecraft profile URL for testing.
    #[must_use]
    pub fn with_minecraft_profile_url(mut self, url: impl Into<String>) -> Self {
        self.minecraft_profile_url = url.into();
        self
    }

    /// Points every endpoint at `base`, keeping the production paths.
    /// Intended for a single mock server handling the whole chain.
    #[must_use]
    pub fn with_base_url(self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}/consumers/oauth2/v2.0/authorize"),
            token_url: format!("{base}/consumers/oauth2/v2.0/token"),
            xbox_auth_url: format!("{base}/user/authenticate"),
            xsts_auth_url: format!("{base}/xsts/authorize"),
            minecraft_login_url: format!("{base}/authentication/login_with_xbox"),
            minecraft_profile_url: format!("{base}/minecraft/profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();

        assert_eq!(endpoints.authorize_url, MICROSOFT_AUTHORIZE_URL);
        assert_eq!(endpoints.token_url, MICROSOFT_TOKEN_URL);
        assert_eq!(endpoints.xbox_auth_url, XBOX_USER_AUTH_URL);
        assert_eq!(endpoints.xsts_auth_url, XSTS_AUTHORIZE_URL);
        assert_eq!(endpoints.minecraft_login_url, MINECRAFT_LOGIN_URL);
        assert_eq!(endpoints.minecraft_profile_url, MINECRAFT_PROFILE_URL);
    }

    #[test]
    fn test_with_base_url() {
        let endpoints = Endpoints::new().with_base_url("http://127.0.0.1:9000/");

        assert_eq!(
            endpoints.token_url,
            "http://127.0.0.1:9000/consumers/oauth2/v2.0/token"
        );
        assert_eq!(
            endpoints.minecraft_profile_url,
            "http://127.0.0.1:9000/minecraft/profile"
        );
    }

    #[test]
    fn test_override_single_endpoint() {
        let endpoints = Endpoints::new().with_token_url("http://127.0.0.1:9001/token");

        assert_eq!(endpoints.token_url, "http://127.0.0.1:9001/token");
        // Others stay at production defaults
        assert_eq!(endpoints.xbox_auth_url, XBOX_USER_AUTH_URL);
    }
}
