//! Account data produced by the login pipeline

use serde::{Deserialize, Serialize};

/// Tokens issued by a single exchange hop.
///
/// Each hop of the login chain consumes the previous hop's token set; only
/// the first hop (the Microsoft token endpoint) issues a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for the next hop (or the final service)
    pub access_token: String,

    /// Token scheme, usually "Bearer"
    pub token_type: String,

    /// Refresh token (only issued by the first hop)
    pub refresh_token: Option<String>,

    /// Token lifetime in seconds, if the issuer reported one
    pub expires_in: Option<i64>,
}

/// Final result of a completed login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    /// In-game player name
    pub username: String,

    /// Stable account identifier (undashed UUID)
    pub id: String,

    /// Minecraft Services access token
    pub access_token: String,

    /// Microsoft refresh token carried over from the first exchange hop.
    /// The Minecraft endpoint does not issue one.
    pub refresh_token: Option<String>,

    /// URL of the currently active skin, if the profile has one
    pub skin_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_profile_roundtrip() {
        let profile = AccountProfile {
            username: "Steve".to_string(),
            id: "069a79f444e94726a5befca90e38aaf5".to_string(),
            access_token: "mc_token".to_string(),
            refresh_token: Some("ms_refresh".to_string()),
            skin_url: None,
        };

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: AccountProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.username, "Steve");
        assert_eq!(parsed.refresh_token, Some("ms_refresh".to_string()));
        assert!(parsed.skin_url.is_none());
    }
}
