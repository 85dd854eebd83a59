//! Session tokens.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// Opaque, URL-safe session identifier.
///
/// A token carries no meaning; it is a random lookup key into the session
/// registry. `Debug` output is redacted so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generates a token from the operating system's entropy source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if the entropy source fails.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generates a token from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if `rng` fails.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.try_fill_bytes(&mut bytes).map_err(|e| {
            tracing::error!(error = %e, "Entropy source failed while generating a session token");
            Error::RandomSource(e)
        })?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Returns the token text, e.g. for a cookie.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    /// Wraps a token received from a client. No validation is done: an
    /// unknown token simply fails to resolve.
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}
