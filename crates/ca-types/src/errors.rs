//! Error types and conversions

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Transport-level failure: connect, DNS, socket bind, request I/O.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with an error status and a JSON error envelope.
    #[error("Provider error ({status}): {code}")]
    Provider {
        /// HTTP status code of the failing response
        status: u16,
        /// Provider error code from the envelope (`error` field)
        code: String,
        /// Optional human-readable detail (`error_description` field)
        message: Option<String>,
    },

    /// A response body that could not be parsed into the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// A broker response was well-formed but lacked a required claim.
    #[error("Missing claim in broker response: {0}")]
    MissingClaim(&'static str),

    #[error("Login timed out")]
    Timeout,

    #[error("Login cancelled")]
    Cancelled,

    /// The authorization redirect carried an `error` parameter.
    #[error("Authorization denied: {error}")]
    RedirectDenied {
        /// Provider error code from the redirect (`error` parameter)
        error: String,
        /// Optional detail (`error_description` parameter)
        description: Option<String>,
    },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for String {
    fn from(err: AuthError) -> String {
        err.to_string()
    }
}
