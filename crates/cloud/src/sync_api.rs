//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`Resolver`] with a Tokio runtime so callers don't need
//! to manage their own async runtime.

#[cfg(feature = "native")]
mod inner {
    use bimgis_core::{Credential, Location};

    use crate::error::{GeocodeError, Result};
    use crate::provider::Provider;
    use crate::resolver::{Resolver, ResolverOptions};

    /// Blocking wrapper around [`Resolver`].
    ///
    /// Uses an internal single-threaded Tokio runtime.
    pub struct ResolverBlocking {
        rt: tokio::runtime::Runtime,
        inner: Resolver,
    }

    impl ResolverBlocking {
        /// Create a blocking resolver with the default provider pair.
        pub fn new(options: ResolverOptions) -> Result<Self> {
            Ok(Self {
                rt: current_thread_runtime()?,
                inner: Resolver::new(options)?,
            })
        }

        /// Resolve a query (blocking).
        pub fn resolve(&self, query: &str, credential: &Credential) -> Result<Location> {
            self.rt.block_on(self.inner.resolve(query, credential))
        }

        /// Providers that would be consulted for `credential`.
        pub fn plan(&self, credential: &Credential) -> Vec<Provider> {
            self.inner.plan(credential)
        }
    }

    /// One-shot convenience function: build a resolver and resolve `query`.
    pub fn resolve(query: &str, credential: &Credential) -> Result<Location> {
        ResolverBlocking::new(ResolverOptions::default())?.resolve(query, credential)
    }

    /// Single-threaded runtime with IO and timers enabled.
    pub fn current_thread_runtime() -> Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GeocodeError::Runtime(e.to_string()))
    }
}

#[cfg(feature = "native")]
pub use inner::*;
