//! Error types for the CSRF guard

use crate::session::SessionError;
use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T, E = CsrfError> = std::result::Result<T, E>;

/// Errors raised while building a [`CsrfConfig`](crate::CsrfConfig).
///
/// A configuration error means no guard can be installed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The form field / session key name is empty or has characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid CSRF token field name \"{0}\"")]
    InvalidFieldName(String),

    /// The cookie name has characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid CSRF token cookie name \"{0}\"")]
    InvalidCookieName(String),

    /// The header name has characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid CSRF token header name \"{0}\"")]
    InvalidHeaderName(String),

    /// An unsafe method entry is not a valid HTTP method.
    #[error("Invalid HTTP method \"{0}\" in unsafe methods")]
    InvalidMethod(String),

    /// The unsafe method list is empty, which would disable validation.
    #[error("Unsafe methods must not be empty")]
    EmptyUnsafeMethods,

    /// Settings could not be loaded or deserialized.
    #[error("Invalid CSRF settings: {0}")]
    Settings(String),
}

/// Fatal errors raised while checking a request.
///
/// Token mismatches are not errors; they are reported through
/// [`Verdict::Halt`](crate::Verdict::Halt).
#[derive(Debug, Error)]
pub enum CsrfError {
    /// No session was available for the request.
    #[error("Sessions are required to use the CSRF guard")]
    SessionUnavailable,

    /// The session backend failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The operating system random source could not produce a token.
    #[error("Secure random source unavailable")]
    EntropyUnavailable(#[source] rand::Error),
}
