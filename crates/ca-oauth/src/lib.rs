//! Microsoft account browser login for Minecraft
//!
//! OAuth 2.0 authorization-code flow with PKCE (S256) against the Microsoft
//! consumer tenant, chained through Xbox Live user authentication and XSTS
//! authorization into a Minecraft Services access token and player profile.
//!
//! # Features
//! - Authorization code flow with PKCE, or the legacy client-secret grant
//! - One-shot loopback callback server for the authorization redirect
//! - Four-hop token exchange with first-failure abort
//! - Refresh login that re-derives the short-lived service token
//! - Exactly-once settlement across redirect, timeout, and cancellation
//!
//! # Usage Example
//! ```no_run
//! use ca_oauth::{AuthConfig, Authenticator, SystemBrowser};
//!
//! # async fn run() -> ca_types::AuthResult<()> {
//! let config = AuthConfig::new("my-azure-client-id", 43319);
//! let authenticator = Authenticator::new(config);
//!
//! let pending = authenticator.authenticate(&SystemBrowser).await?;
//! let account = pending.wait().await?;
//! println!("Logged in as {}", account.username);
//! # Ok(())
//! # }
//! ```

pub mod browser;
mod callback_server;
pub mod endpoints;
pub mod flow;
pub mod pkce;
mod session;
pub mod token_exchange;
pub mod types;

// Re-export public API
pub use browser::{SystemBrowser, UrlOpener};
pub use ca_types::{AccountProfile, AuthError, AuthResult, TokenSet};
pub use endpoints::Endpoints;
pub use flow::{Authenticator, CancelHandle, PendingLogin};
pub use pkce::{derive_challenge, PkcePair};
pub use token_exchange::TokenExchanger;
pub use types::{AuthConfig, GrantKind, SessionId};
