//! Browser-opening seam
//!
//! The flow itself never talks to the desktop; it hands the authorization
//! URL to a [`UrlOpener`]. Tests substitute a recording implementation.

use ca_types::{AuthError, AuthResult};
use tracing::debug;

/// Puts an authorization URL in front of the user.
pub trait UrlOpener: Send + Sync {
    /// Open `url` for the user to complete the provider login.
    fn open_url(&self, url: &str) -> AuthResult<()>;
}

/// Opens the URL with the platform default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open_url(&self, url: &str) -> AuthResult<()> {
        debug!("Opening system browser");
        open::that(url).map_err(|e| AuthError::Network(format!("Failed to open browser: {e}")))
    }
}
