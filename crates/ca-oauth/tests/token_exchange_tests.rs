//! Integration tests for the token exchange chain
//!
//! Every hop is mocked with wiremock; no real Microsoft, Xbox, or Minecraft
//! endpoint is contacted.

use ca_oauth::{AuthConfig, AuthError, Endpoints, GrantKind, TokenExchanger, TokenSet};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> AuthConfig {
    AuthConfig::new("client-123", 43319)
}

fn first_hop_tokens() -> TokenSet {
    TokenSet {
        access_token: "ms-access".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: Some("ms-refresh".to_string()),
        expires_in: Some(3600),
    }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ms-access",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "ms-refresh"
        })))
        .mount(server)
        .await;
}

async fn mount_downstream_hops(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/user/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Token": "xbox-token",
            "DisplayClaims": {"xui": [{"uhs": "user-hash-1"}]}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/xsts/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Token": "xsts-token",
            "DisplayClaims": {"xui": [{"uhs": "user-hash-1"}]}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authentication/login_with_xbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mc-access",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/minecraft/profile"))
        .and(header("authorization", "Bearer mc-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "069a79f444e94726a5befca90e38aaf5",
            "name": "Steve",
            "skins": [
                {"state": "INACTIVE", "url": "https://textures.example/old"},
                {"state": "ACTIVE", "url": "https://textures.example/current"}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exchange_code_sends_pkce_verifier() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier=verifier-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ms-access",
            "token_type": "Bearer",
            "refresh_token": "ms-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let tokens = exchanger
        .exchange_code(&test_config(), "auth-code-1", Some("verifier-1"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "ms-access");
    assert_eq!(tokens.refresh_token, Some("ms-refresh".to_string()));
}

#[tokio::test]
async fn test_exchange_code_with_client_secret_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .and(body_string_contains("client_secret=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ms-access",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config().with_grant(GrantKind::ClientSecret {
        secret: "s3cr3t".to_string(),
    });
    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let tokens = exchanger
        .exchange_code(&config, "auth-code-1", None)
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "ms-access");

    // The secret grant must not send PKCE material
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("code_verifier"));
}

#[tokio::test]
async fn test_complete_login_builds_profile_from_chain() {
    let server = MockServer::start().await;
    mount_downstream_hops(&server).await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let account = exchanger.complete_login(first_hop_tokens()).await.unwrap();

    assert_eq!(account.username, "Steve");
    assert_eq!(account.id, "069a79f444e94726a5befca90e38aaf5");
    assert_eq!(account.access_token, "mc-access");
    // Refresh token comes from the first hop, not the Minecraft endpoint
    assert_eq!(account.refresh_token, Some("ms-refresh".to_string()));
    assert_eq!(
        account.skin_url,
        Some("https://textures.example/current".to_string())
    );
}

#[tokio::test]
async fn test_chain_stops_at_first_failing_hop() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/authenticate"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized_client"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Stages 3 and 4 must never be reached
    Mock::given(method("POST"))
        .and(path("/xsts/authorize"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authentication/login_with_xbox"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .complete_login(first_hop_tokens())
        .await
        .unwrap_err();

    match err {
        AuthError::Provider { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "unauthorized_client");
        }
        other => panic!("Expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_xui_claims_yield_missing_claim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Token": "xbox-token",
            "DisplayClaims": {"xui": [{"uhs": "user-hash-1"}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/xsts/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Token": "xsts-token",
            "DisplayClaims": {"xui": []}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authentication/login_with_xbox"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .complete_login(first_hop_tokens())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MissingClaim(_)));
}

#[tokio::test]
async fn test_provider_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The authorization code has expired"
        })))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .exchange_code(&test_config(), "stale-code", Some("verifier-1"))
        .await
        .unwrap_err();

    match err {
        AuthError::Provider {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "invalid_grant");
            assert_eq!(
                message,
                Some("The authorization code has expired".to_string())
            );
        }
        other => panic!("Expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_error_without_code_defaults_to_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({})))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .exchange_code(&test_config(), "auth-code-1", Some("verifier-1"))
        .await
        .unwrap_err();

    match err {
        AuthError::Provider { status, code, .. } => {
            assert_eq!(status, 500);
            assert_eq!(code, "Unknown error");
        }
        other => panic!("Expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_malformed_regardless_of_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .exchange_code(&test_config(), "auth-code-1", Some("verifier-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Malformed(_)));
}

#[tokio::test]
async fn test_success_body_with_wrong_shape_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let err = exchanger
        .exchange_code(&test_config(), "auth-code-1", Some("verifier-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Malformed(_)));
}

#[tokio::test]
async fn test_refresh_exchange_keeps_original_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ms-access-2",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let tokens = exchanger
        .exchange_refresh(&test_config(), "old-refresh")
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "ms-access-2");
    // Endpoint did not rotate the refresh token; the old one is preserved
    assert_eq!(tokens.refresh_token, Some("old-refresh".to_string()));
}

#[tokio::test]
async fn test_refresh_exchange_uses_rotated_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ms-access-2",
            "token_type": "Bearer",
            "refresh_token": "new-refresh"
        })))
        .mount(&server)
        .await;

    let exchanger = TokenExchanger::with_endpoints(Endpoints::new().with_base_url(&server.uri()));
    let tokens = exchanger
        .exchange_refresh(&test_config(), "old-refresh")
        .await
        .unwrap();

    assert_eq!(tokens.refresh_token, Some("new-refresh".to_string()));
}
