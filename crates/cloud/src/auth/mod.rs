//! Request authentication for geocoding providers.

mod key;
mod none;

pub use key::KeyAuth;
pub use none::NoAuth;

/// Trait for signing outgoing provider requests.
///
/// Implementations append whatever query parameters the provider needs to
/// authenticate the caller.
pub trait RequestAuth: Send + Sync {
    /// Add authentication parameters to `query`.
    fn sign_query(&self, query: &mut Vec<(String, String)>);
}
