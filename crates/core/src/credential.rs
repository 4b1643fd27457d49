//! Provider API key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque access token for the premium map and geocoding provider.
///
/// An empty token means "no credential". Provider-specific layers and the
/// primary geocoding path are only available when a token is present. The
/// token format is never validated.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Surrounding whitespace is kept as-is.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The absent credential.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw token, for building provider URLs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("Credential(<redacted>)")
        } else {
            f.write_str("Credential(<none>)")
        }
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}
