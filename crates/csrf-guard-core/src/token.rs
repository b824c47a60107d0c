use crate::error::{CsrfError, Result};
use crate::session::SessionStore;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use std::fmt;

/// Number of random bytes in a generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// A CSRF token.
///
/// Generated tokens are 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a new random token from the operating system CSPRNG.
    ///
    /// There is no fallback source: if the OS cannot provide randomness the
    /// error is returned.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(CsrfError::EntropyUnavailable)?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Create a token from an existing string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning the string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CsrfToken").field(&"***").finish()
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return the token bound to `session` under `key`, issuing one if the slot
/// is absent or empty.
///
/// Repeated calls return the same token until the session is cleared.
pub fn ensure_token(session: &dyn SessionStore, key: &str) -> Result<CsrfToken> {
    let mut issued = false;
    let value = session.get_or_insert_with(key, &mut || {
        issued = true;
        CsrfToken::generate().map(CsrfToken::into_string)
    })?;

    if issued {
        tracing::debug!(key, "issued new CSRF token for session");
    }

    Ok(CsrfToken(value))
}
