//! No-op authentication for public endpoints.

use crate::auth::RequestAuth;

/// No authentication, for the open fallback geocoder.
pub struct NoAuth;

impl RequestAuth for NoAuth {
    fn sign_query(&self, _query: &mut Vec<(String, String)>) {}
}
