//! One-shot loopback server for the authorization redirect
//!
//! Binds `127.0.0.1` on the configured port with a single GET route at the
//! configured redirect path. The first request settles the session; the
//! server then shuts itself down and never serves a second redirect.

use crate::session::SessionShared;
use crate::token_exchange::TokenExchanger;
use crate::types::AuthConfig;
use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Router,
};
use ca_types::{AuthError, AuthResult};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Query parameters of the authorization redirect
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Everything the redirect handler needs to finish the flow.
pub(crate) struct CallbackContext {
    pub session: Arc<SessionShared>,
    pub exchanger: Arc<TokenExchanger>,
    pub config: AuthConfig,
    /// PKCE verifier for the code exchange; `None` for the secret grant.
    pub code_verifier: Option<String>,
}

/// Bind the listener and start serving in a background task.
///
/// Returns once the socket is bound, so a port conflict fails the caller
/// before any browser opens. The server exits when `shutdown_rx` fires and
/// the in-flight request (if any) has completed.
pub(crate) async fn start(
    ctx: Arc<CallbackContext>,
    shutdown_rx: oneshot::Receiver<()>,
) -> AuthResult<()> {
    let addr = format!("127.0.0.1:{}", ctx.config.callback_port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AuthError::Network(format!(
            "Failed to bind callback server on port {}: {}",
            ctx.config.callback_port, e
        ))
    })?;

    info!(
        "Callback server listening on http://{}{}",
        addr, ctx.config.redirect_path
    );

    let handler = {
        let ctx = Arc::clone(&ctx);
        move |Query(params): Query<CallbackQuery>| {
            let ctx = Arc::clone(&ctx);
            async move { handle_redirect(ctx, params).await }
        }
    };

    let app = Router::new().route(&ctx.config.redirect_path, axum::routing::get(handler));
    let session = Arc::clone(&ctx.session);

    tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = serve.await {
            error!("Callback server error: {e}");
        }
        debug!("Session {}: callback server stopped", session.id());
    });

    Ok(())
}

async fn handle_redirect(ctx: Arc<CallbackContext>, params: CallbackQuery) -> Response {
    // The listener handles exactly one redirect. A second request racing in
    // before shutdown completes gets a terminal page and no side effects.
    if !ctx.session.claim_callback() {
        warn!(
            "Session {}: redirect received after the flow was already handled",
            ctx.session.id()
        );
        return (
            StatusCode::GONE,
            Html(failure_page("This login attempt has already completed.")),
        )
            .into_response();
    }

    if let Some(code) = params.code {
        handle_code(ctx, &code).await
    } else if let Some(provider_error) = params.error {
        let description = params.error_description;
        error!(
            "Session {}: authorization failed: {} - {}",
            ctx.session.id(),
            provider_error,
            description.as_deref().unwrap_or("Unknown error")
        );

        let page = failure_page(&format!(
            "{}: {}",
            provider_error,
            description.as_deref().unwrap_or("Unknown error")
        ));
        ctx.session.finish(Err(AuthError::RedirectDenied {
            error: provider_error,
            description,
        }));
        (StatusCode::BAD_REQUEST, Html(page)).into_response()
    } else {
        warn!(
            "Session {}: redirect carried neither code nor error",
            ctx.session.id()
        );
        ctx.session.finish(Err(AuthError::Malformed(
            "Redirect carried neither code nor error".to_string(),
        )));
        (
            StatusCode::BAD_REQUEST,
            Html(failure_page("Authentication failed - Unknown Error")),
        )
            .into_response()
    }
}

/// Run the exchange chain for a received authorization code and settle the
/// session with the outcome. The browser page reflects the result.
async fn handle_code(ctx: Arc<CallbackContext>, code: &str) -> Response {
    // Cancellation or timeout may have won while the redirect was in flight.
    if ctx.session.is_settled() {
        return (
            StatusCode::GONE,
            Html(failure_page("This login attempt has already completed.")),
        )
            .into_response();
    }

    info!(
        "Session {}: authorization code received, starting token exchange",
        ctx.session.id()
    );

    let result = async {
        let first = ctx
            .exchanger
            .exchange_code(&ctx.config, code, ctx.code_verifier.as_deref())
            .await?;
        ctx.exchanger.complete_login(first).await
    }
    .await;

    let page = match &result {
        Ok(profile) => {
            info!(
                "Session {}: login succeeded for {}",
                ctx.session.id(),
                profile.username
            );
            (StatusCode::OK, Html(success_page()))
        }
        Err(e) => {
            error!("Session {}: token exchange failed: {}", ctx.session.id(), e);
            (StatusCode::BAD_REQUEST, Html(failure_page(&e.to_string())))
        }
    };

    ctx.session.finish(result);
    page.into_response()
}

fn success_page() -> String {
    r#"<html>
    <head><title>Login Successful</title></head>
    <body style="font-family: sans-serif; text-align: center; padding: 50px;">
        <h1>Login successful</h1>
        <p>You can close this page now.</p>
    </body>
</html>"#
        .to_string()
}

fn failure_page(detail: &str) -> String {
    format!(
        r#"<html>
    <head><title>Login Failed</title></head>
    <body style="font-family: sans-serif; text-align: center; padding: 50px;">
        <h1>Login failed</h1>
        <p>{detail}</p>
    </body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_query_with_code() {
        let query: CallbackQuery = serde_urlencoded_parse("code=abc123&state=xyz");
        assert_eq!(query.code, Some("abc123".to_string()));
        assert!(query.error.is_none());
    }

    #[test]
    fn test_callback_query_with_error() {
        let query: CallbackQuery =
            serde_urlencoded_parse("error=access_denied&error_description=User%20cancelled");
        assert!(query.code.is_none());
        assert_eq!(query.error, Some("access_denied".to_string()));
        assert_eq!(query.error_description, Some("User cancelled".to_string()));
    }

    #[test]
    fn test_callback_query_tolerates_bare_parameters() {
        // A parameter without `=` must not break code/error differentiation
        let query: CallbackQuery = serde_urlencoded_parse("flag&code=abc123");
        assert_eq!(query.code, Some("abc123".to_string()));
        assert!(query.error.is_none());
    }

    #[test]
    fn test_callback_query_url_decodes_values() {
        let query: CallbackQuery = serde_urlencoded_parse("code=a%2Bb%3Dc");
        assert_eq!(query.code, Some("a+b=c".to_string()));
    }

    fn serde_urlencoded_parse(query: &str) -> CallbackQuery {
        // Same deserializer axum's Query extractor uses
        serde_urlencoded::from_str(query).unwrap()
    }
}
