//! API-key authentication for V-World endpoints.

use bimgis_core::Credential;

use crate::auth::RequestAuth;

/// Appends the provider key as a `key` query parameter.
pub struct KeyAuth<'a> {
    credential: &'a Credential,
}

impl<'a> KeyAuth<'a> {
    /// # Panics
    ///
    /// Panics if `credential` is empty; callers must gate keyed requests on
    /// credential presence.
    pub fn new(credential: &'a Credential) -> Self {
        assert!(
            credential.is_present(),
            "keyed provider request built without a credential"
        );
        Self { credential }
    }
}

impl RequestAuth for KeyAuth<'_> {
    fn sign_query(&self, query: &mut Vec<(String, String)>) {
        query.push(("key".to_string(), self.credential.expose().to_string()));
    }
}
