//! Primary/fallback geocoding cascade.
//!
//! The primary provider (V-World) is tried first when a credential is
//! present. Its transport failures and empty answers fall through to the
//! fallback provider (Nominatim); malformed coordinates from whichever
//! provider answered are surfaced immediately.

use std::sync::Arc;
use std::time::Duration;

use bimgis_core::{Credential, Location};
use tracing::{error, info, warn};

use crate::error::{GeocodeError, Result};
use crate::http::HttpClient;
use crate::nominatim::{NominatimGeocoder, NOMINATIM_SEARCH_URL};
use crate::provider::{Geocoder, Provider};
use crate::vworld::{VWorldGeocoder, VWORLD_SEARCH_URL};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum retries on timeouts/connection failures (default 2).
    pub max_retries: u32,
    /// `User-Agent` sent to both providers. Nominatim rejects anonymous clients.
    pub user_agent: String,
    pub vworld_search_url: String,
    pub nominatim_search_url: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            user_agent: concat!("bimgis/", env!("CARGO_PKG_VERSION")).to_string(),
            vworld_search_url: VWORLD_SEARCH_URL.to_string(),
            nominatim_search_url: NOMINATIM_SEARCH_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves free text to a [`Location`] via a primary and a fallback geocoder.
///
/// No request fencing is done: if a caller starts a second resolution before
/// the first completes, both run to completion and whichever the caller
/// applies last wins.
pub struct Resolver {
    primary: Box<dyn Geocoder>,
    fallback: Box<dyn Geocoder>,
}

impl Resolver {
    /// Build the V-World → Nominatim resolver.
    pub fn new(options: ResolverOptions) -> Result<Self> {
        let http = Arc::new(HttpClient::new(
            options.request_timeout,
            options.max_retries,
            &options.user_agent,
        )?);
        Ok(Self {
            primary: Box::new(VWorldGeocoder::new(
                Arc::clone(&http),
                options.vworld_search_url,
            )),
            fallback: Box::new(NominatimGeocoder::new(http, options.nominatim_search_url)),
        })
    }

    /// Use arbitrary providers (tests, alternative services).
    pub fn with_providers(primary: Box<dyn Geocoder>, fallback: Box<dyn Geocoder>) -> Self {
        Self { primary, fallback }
    }

    /// Resolve `query` to a location.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::EmptyQuery`] for blank input (no request is made).
    /// - [`GeocodeError::InvalidLocation`] if the answering provider sent
    ///   coordinates that are not finite numbers.
    /// - [`GeocodeError::NotFound`] if no provider had a usable item.
    /// - [`GeocodeError::Transport`] if the fallback provider failed.
    pub async fn resolve(&self, query: &str, credential: &Credential) -> Result<Location> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let mut attempted = Vec::with_capacity(2);

        if self.primary.is_available(credential) {
            attempted.push(self.primary.provider());
            match self.primary.geocode(query, credential).await {
                Ok(Some(loc)) => {
                    info!(provider = %self.primary.provider(), name = loc.display_name(), "location resolved");
                    return Ok(loc);
                }
                Ok(None) => {
                    info!(provider = %self.primary.provider(), query, "no result, trying fallback");
                }
                Err(e @ GeocodeError::InvalidLocation { .. }) => return Err(e),
                Err(e) => {
                    warn!(provider = %self.primary.provider(), error = %e, "primary geocoder failed, falling back");
                }
            }
        }

        attempted.push(self.fallback.provider());
        match self.fallback.geocode(query, credential).await {
            Ok(Some(loc)) => {
                info!(provider = %self.fallback.provider(), name = loc.display_name(), "location resolved");
                Ok(loc)
            }
            Ok(None) => Err(GeocodeError::NotFound {
                query: query.to_string(),
                attempted,
            }),
            Err(e) => {
                if e.is_transport() {
                    error!(provider = %self.fallback.provider(), error = %e, "fallback geocoder failed");
                }
                Err(e)
            }
        }
    }

    /// Providers that would be consulted for `credential`, in order.
    pub fn plan(&self, credential: &Credential) -> Vec<Provider> {
        let mut plan = Vec::with_capacity(2);
        if self.primary.is_available(credential) {
            plan.push(self.primary.provider());
        }
        plan.push(self.fallback.provider());
        plan
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nominatim::{self, NominatimPlace};
    use crate::vworld::VWorldEnvelope;
    use approx::assert_relative_eq;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned provider that replays a fixed outcome and counts calls.
    struct FakeGeocoder {
        provider: Provider,
        needs_key: bool,
        outcome: fn() -> Result<Option<Location>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeGeocoder {
        fn primary(outcome: fn() -> Result<Option<Location>>) -> Self {
            Self {
                provider: Provider::VWorld,
                needs_key: true,
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn fallback(outcome: fn() -> Result<Option<Location>>) -> Self {
            Self {
                provider: Provider::Nominatim,
                needs_key: false,
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Geocoder for FakeGeocoder {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn is_available(&self, credential: &Credential) -> bool {
            !self.needs_key || credential.is_present()
        }

        fn geocode<'a>(
            &'a self,
            _query: &'a str,
            _credential: &'a Credential,
        ) -> BoxFuture<'a, Result<Option<Location>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = (self.outcome)();
            Box::pin(async move { outcome })
        }
    }

    fn teheran() -> Result<Option<Location>> {
        let env: VWorldEnvelope = serde_json::from_str(
            r#"{"response":{"status":"OK","result":{"items":[
                {"point":{"x":127.0,"y":37.5},"address":{"road":"Teheran-ro"}}
            ]}}}"#,
        )
        .unwrap();
        env.first_location("q")
    }

    fn gangnam() -> Result<Option<Location>> {
        let places: Vec<NominatimPlace> = serde_json::from_str(
            r#"[{"lat":"37.5","lon":"127.0","display_name":"Gangnam, Seoul, KR"}]"#,
        )
        .unwrap();
        nominatim::first_location(&places)
    }

    fn empty() -> Result<Option<Location>> {
        Ok(None)
    }

    fn garbage() -> Result<Option<Location>> {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(r#"[{"lat":"abc","lon":"127.0","display_name":"x"}]"#).unwrap();
        nominatim::first_location(&places)
    }

    fn garbage_primary() -> Result<Option<Location>> {
        let env: VWorldEnvelope = serde_json::from_str(
            r#"{"response":{"status":"OK","result":{"items":[
                {"point":{"x":"127.0","y":"abc"},"address":{"road":"r"}}
            ]}}}"#,
        )
        .unwrap();
        env.first_location("q")
    }

    fn pointless_primary() -> Result<Option<Location>> {
        let env: VWorldEnvelope = serde_json::from_str(
            r#"{"response":{"status":"OK","result":{"items":[{"address":{"road":"r"}}]}}}"#,
        )
        .unwrap();
        env.first_location("q")
    }

    fn offline() -> Result<Option<Location>> {
        Err(GeocodeError::Transport {
            provider: Provider::VWorld,
            message: "connection refused".into(),
        })
    }

    fn offline_fallback() -> Result<Option<Location>> {
        Err(GeocodeError::Transport {
            provider: Provider::Nominatim,
            message: "connection refused".into(),
        })
    }

    fn resolver(
        primary: fn() -> Result<Option<Location>>,
        fallback: fn() -> Result<Option<Location>>,
    ) -> (Resolver, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let p = FakeGeocoder::primary(primary);
        let f = FakeGeocoder::fallback(fallback);
        let (pc, fc) = (Arc::clone(&p.calls), Arc::clone(&f.calls));
        (Resolver::with_providers(Box::new(p), Box::new(f)), pc, fc)
    }

    #[tokio::test]
    async fn primary_hit_short_circuits() {
        let (r, pc, fc) = resolver(teheran, gangnam);
        let loc = r.resolve("Teheran", &Credential::new("k")).await.unwrap();
        assert_relative_eq!(loc.latitude(), 37.5);
        assert_relative_eq!(loc.longitude(), 127.0);
        assert_eq!(loc.display_name(), "Teheran-ro");
        assert_eq!(pc.load(Ordering::SeqCst), 1);
        assert_eq!(fc.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back() {
        let (r, pc, fc) = resolver(offline, gangnam);
        let loc = r.resolve("Gangnam", &Credential::new("k")).await.unwrap();
        assert_eq!(loc.display_name(), "Gangnam");
        assert_eq!(pc.load(Ordering::SeqCst), 1);
        assert_eq!(fc.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn primary_empty_falls_back() {
        let (r, _, fc) = resolver(empty, gangnam);
        let loc = r.resolve("Gangnam", &Credential::new("k")).await.unwrap();
        assert_eq!(loc.display_name(), "Gangnam");
        assert_eq!(fc.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_credential_skips_primary() {
        let (r, pc, _) = resolver(teheran, gangnam);
        let loc = r.resolve("Gangnam", &Credential::none()).await.unwrap();
        assert_relative_eq!(loc.latitude(), 37.5);
        assert_relative_eq!(loc.longitude(), 127.0);
        assert_eq!(loc.display_name(), "Gangnam");
        assert_eq!(pc.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_fallback_is_not_found() {
        let (r, _, _) = resolver(teheran, empty);
        let err = r.resolve("nowhere", &Credential::none()).await.unwrap_err();
        match err {
            GeocodeError::NotFound { query, attempted } => {
                assert_eq!(query, "nowhere");
                assert_eq!(attempted, vec![Provider::Nominatim]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_lists_both_providers() {
        let (r, _, _) = resolver(empty, empty);
        let err = r.resolve("nowhere", &Credential::new("k")).await.unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::NotFound { ref attempted, .. }
                if attempted == &vec![Provider::VWorld, Provider::Nominatim]
        ));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_not_not_found() {
        let (r, _, _) = resolver(teheran, garbage);
        let err = r.resolve("x", &Credential::none()).await.unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidLocation { .. }));
    }

    #[tokio::test]
    async fn invalid_primary_coordinates_do_not_fall_back() {
        let (r, _, fc) = resolver(garbage_primary, gangnam);
        let err = r.resolve("x", &Credential::new("k")).await.unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::InvalidLocation {
                provider: Provider::VWorld,
                ..
            }
        ));
        assert_eq!(fc.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_item_without_point_falls_back() {
        let (r, pc, fc) = resolver(pointless_primary, gangnam);
        let loc = r.resolve("Gangnam", &Credential::new("k")).await.unwrap();
        assert_eq!(loc.display_name(), "Gangnam");
        assert_eq!(pc.load(Ordering::SeqCst), 1);
        assert_eq!(fc.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_transport_failure_surfaces() {
        let (r, _, _) = resolver(offline, offline_fallback);
        let err = r.resolve("x", &Credential::new("k")).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn blank_query_makes_no_request() {
        let (r, pc, fc) = resolver(teheran, gangnam);
        let err = r.resolve("   ", &Credential::new("k")).await.unwrap_err();
        assert!(matches!(err, GeocodeError::EmptyQuery));
        assert_eq!(pc.load(Ordering::SeqCst) + fc.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn plan_depends_on_credential() {
        let (r, _, _) = resolver(empty, empty);
        assert_eq!(r.plan(&Credential::none()), vec![Provider::Nominatim]);
        assert_eq!(
            r.plan(&Credential::new("k")),
            vec![Provider::VWorld, Provider::Nominatim]
        );
    }
}
