//! Token exchange client for the login chain
//!
//! Walks the four sequential hops: Microsoft token endpoint → Xbox Live user
//! authentication → XSTS authorization → Minecraft Services login, then the
//! profile fetch. Each hop consumes the previous hop's token; the first
//! failing hop aborts the chain.

use crate::endpoints::Endpoints;
use crate::types::{AuthConfig, GrantKind};
use ca_types::{AccountProfile, AuthError, AuthResult, TokenSet};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Per-request deadline applied to every hop
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token response from the Microsoft token endpoint
#[derive(Debug, Deserialize)]
struct MicrosoftTokenResponse {
    /// Access token consumed by the Xbox hop
    access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default)]
    token_type: String,

    /// Expires in seconds
    #[serde(default)]
    expires_in: Option<i64>,

    /// Refresh token (optional)
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Response shape shared by the Xbox user and XSTS authorize endpoints
#[derive(Debug, Deserialize)]
struct XboxAuthResponse {
    #[serde(rename = "Token")]
    token: String,

    #[serde(rename = "DisplayClaims", default)]
    display_claims: DisplayClaims,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayClaims {
    #[serde(default)]
    xui: Vec<XuiClaim>,
}

#[derive(Debug, Deserialize)]
struct XuiClaim {
    uhs: String,
}

/// Response from the Minecraft Services login endpoint
#[derive(Debug, Deserialize)]
struct MinecraftLoginResponse {
    access_token: String,

    #[serde(default)]
    token_type: String,

    #[serde(default)]
    expires_in: Option<i64>,
}

/// Response from the Minecraft Services profile endpoint
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: String,
    name: String,

    #[serde(default)]
    skins: Vec<ProfileSkin>,
}

#[derive(Debug, Deserialize)]
struct ProfileSkin {
    #[serde(default)]
    state: String,

    #[serde(default)]
    url: String,
}

/// Client for the sequential token-exchange hops
pub struct TokenExchanger {
    client: Client,
    endpoints: Endpoints,
}

impl TokenExchanger {
    /// Create an exchanger against the production endpoints
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    /// Create an exchanger against a custom endpoint set (tests)
    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchange an authorization code for the first-hop token set.
    ///
    /// `code_verifier` is the PKCE verifier for the
    /// [`GrantKind::AuthorizationCodePkce`] grant; the legacy secret grant
    /// ignores it and sends the client secret instead.
    pub async fn exchange_code(
        &self,
        config: &AuthConfig,
        code: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<TokenSet> {
        debug!("Exchanging authorization code for Microsoft tokens");

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code".to_string());
        params.insert("client_id", config.client_id.clone());
        params.insert("code", code.to_string());
        params.insert("redirect_uri", config.redirect_uri());

        match &config.grant {
            GrantKind::AuthorizationCodePkce => {
                if let Some(verifier) = code_verifier {
                    params.insert("code_verifier", verifier.to_string());
                }
            }
            GrantKind::ClientSecret { secret } => {
                params.insert("client_secret", secret.clone());
            }
        }

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token request failed: {e}")))?;

        let token: MicrosoftTokenResponse = parse_json_response(response).await?;
        Ok(microsoft_token_set(token))
    }

    /// Exchange a refresh token for a fresh first-hop token set.
    ///
    /// The original refresh token is kept when the endpoint does not rotate
    /// it.
    pub async fn exchange_refresh(
        &self,
        config: &AuthConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenSet> {
        debug!("Exchanging refresh token for Microsoft tokens");

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token".to_string());
        params.insert("client_id", config.client_id.clone());
        params.insert("refresh_token", refresh_token.to_string());

        if let GrantKind::ClientSecret { secret } = &config.grant {
            params.insert("client_secret", secret.clone());
        }

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Refresh request failed: {e}")))?;

        let token: MicrosoftTokenResponse = parse_json_response(response).await?;
        let mut tokens = microsoft_token_set(token);
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    /// Run hops 2-4 and the profile fetch on top of a first-hop token set.
    ///
    /// The returned profile carries `first`'s refresh token; the Minecraft
    /// endpoint never issues one.
    pub async fn complete_login(&self, first: TokenSet) -> AuthResult<AccountProfile> {
        let xbox = self.authenticate_xbox(&first.access_token).await?;
        let xsts = self.authorize_xsts(&xbox.token).await?;
        let uhs = user_hash(&xsts)?.to_string();
        let minecraft = self.login_minecraft(&uhs, &xsts.token).await?;
        self.fetch_profile(&minecraft, first.refresh_token).await
    }

    /// Hop 2: trade the Microsoft access token for an Xbox Live user token.
    async fn authenticate_xbox(&self, ms_access_token: &str) -> AuthResult<XboxAuthResponse> {
        debug!("Authenticating with Xbox Live");

        let body = json!({
            "Properties": {
                "AuthMethod": "RPS",
                "SiteName": "user.auth.xboxlive.com",
                "RpsTicket": format!("d={ms_access_token}"),
            },
            "RelyingParty": "http://auth.xboxlive.com",
            "TokenType": "JWT",
        });

        let response = self
            .client
            .post(&self.endpoints.xbox_auth_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Xbox authentication failed: {e}")))?;

        parse_json_response(response).await
    }

    /// Hop 3: trade the Xbox user token for an XSTS token scoped to the
    /// Minecraft Services relying party.
    async fn authorize_xsts(&self, xbox_token: &str) -> AuthResult<XboxAuthResponse> {
        debug!("Authorizing with XSTS");

        let body = json!({
            "Properties": {
                "SandboxId": "RETAIL",
                "UserTokens": [xbox_token],
            },
            "RelyingParty": "rp://api.minecraftservices.com/",
            "TokenType": "JWT",
        });

        let response = self
            .client
            .post(&self.endpoints.xsts_auth_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("XSTS authorization failed: {e}")))?;

        parse_json_response(response).await
    }

    /// Hop 4: log into Minecraft Services with the XSTS identity token.
    async fn login_minecraft(&self, uhs: &str, xsts_token: &str) -> AuthResult<TokenSet> {
        debug!("Logging into Minecraft Services");

        let body = json!({
            "identityToken": format!("XBL3.0 x={uhs};{xsts_token}"),
        });

        let response = self
            .client
            .post(&self.endpoints.minecraft_login_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Minecraft login failed: {e}")))?;

        let login: MinecraftLoginResponse = parse_json_response(response).await?;
        Ok(TokenSet {
            access_token: login.access_token,
            token_type: login.token_type,
            refresh_token: None,
            expires_in: login.expires_in,
        })
    }

    /// Fetch the player profile with the Minecraft token and assemble the
    /// final account.
    async fn fetch_profile(
        &self,
        minecraft: &TokenSet,
        refresh_token: Option<String>,
    ) -> AuthResult<AccountProfile> {
        debug!("Fetching Minecraft profile");

        let response = self
            .client
            .get(&self.endpoints.minecraft_profile_url)
            .timeout(REQUEST_TIMEOUT)
            .header(
                AUTHORIZATION,
                format!("{} {}", minecraft.token_type, minecraft.access_token),
            )
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Profile request failed: {e}")))?;

        let profile: ProfileResponse = parse_json_response(response).await?;
        let skin_url = active_skin_url(&profile);

        info!("Login chain completed for {}", profile.name);

        Ok(AccountProfile {
            username: profile.name,
            id: profile.id,
            access_token: minecraft.access_token.clone(),
            refresh_token,
            skin_url,
        })
    }
}

impl Default for TokenExchanger {
    fn default() -> Self {
        Self::new()
    }
}

fn microsoft_token_set(token: MicrosoftTokenResponse) -> TokenSet {
    TokenSet {
        access_token: token.access_token,
        token_type: token.token_type,
        refresh_token: token.refresh_token,
        expires_in: token.expires_in,
    }
}

/// Extract the user hash from XSTS display claims. An empty `xui` array is a
/// hard failure, not a default.
fn user_hash(xsts: &XboxAuthResponse) -> AuthResult<&str> {
    xsts.display_claims
        .xui
        .first()
        .map(|claim| claim.uhs.as_str())
        .ok_or(AuthError::MissingClaim("DisplayClaims.xui[0].uhs"))
}

/// URL of the skin whose `state` is exactly "ACTIVE", if any.
fn active_skin_url(profile: &ProfileResponse) -> Option<String> {
    profile
        .skins
        .iter()
        .find(|skin| skin.state == "ACTIVE")
        .map(|skin| skin.url.clone())
}

/// Parse a response under the shared error policy: a body that is not JSON
/// is malformed regardless of status; a status >= 400 with a JSON body
/// surfaces the provider's error envelope.
async fn parse_json_response<T: serde::de::DeserializeOwned>(response: Response) -> AuthResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Network(format!("Failed to read response body: {e}")))?;

    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| AuthError::Malformed(format!("Response is not valid JSON: {e}")))?;

    if status.as_u16() >= 400 {
        let code = value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        let message = value
            .get("error_description")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        error!("Provider returned HTTP {}: {}", status.as_u16(), code);
        return Err(AuthError::Provider {
            status: status.as_u16(),
            code,
            message,
        });
    }

    serde_json::from_value(value)
        .map_err(|e| AuthError::Malformed(format!("Unexpected response shape: {e}")))
}
