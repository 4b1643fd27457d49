//! OpenStreetMap Nominatim free-text search (fallback geocoder).

use std::sync::Arc;

use bimgis_core::{Credential, Location};
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::auth::NoAuth;
use crate::error::{GeocodeError, Result};
use crate::http::HttpClient;
use crate::provider::{location_from_coords, Coord, Geocoder, Provider};

/// Default Nominatim search endpoint.
pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

/// One entry of the `format=json` result array.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: Option<Coord>,
    pub lon: Option<Coord>,
    #[serde(default)]
    pub display_name: String,
}

impl NominatimPlace {
    /// Portion of the display name before the first comma.
    pub fn short_name(&self) -> &str {
        self.display_name
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Map the first place to a location; an empty list is `Ok(None)`.
///
/// A place without `lat`/`lon` is a malformed response and reported as
/// `Transport`.
pub fn first_location(places: &[NominatimPlace]) -> Result<Option<Location>> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let (Some(lat), Some(lon)) = (place.lat.as_ref(), place.lon.as_ref()) else {
        return Err(GeocodeError::transport(
            Provider::Nominatim,
            "result is missing lat/lon",
        ));
    };
    location_from_coords(Provider::Nominatim, lat, lon, place.short_name()).map(Some)
}

/// Fallback geocoder, always available.
pub struct NominatimGeocoder {
    http: Arc<HttpClient>,
    search_url: String,
}

impl NominatimGeocoder {
    pub fn new(http: Arc<HttpClient>, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<Option<Location>> {
        let params = [("format", "json"), ("q", query), ("limit", "1")];
        let places: Vec<NominatimPlace> = self
            .http
            .get_json(Provider::Nominatim, &self.search_url, &params, &NoAuth)
            .await?;
        first_location(&places)
    }
}

impl Geocoder for NominatimGeocoder {
    fn provider(&self) -> Provider {
        Provider::Nominatim
    }

    fn is_available(&self, _credential: &Credential) -> bool {
        true
    }

    fn geocode<'a>(
        &'a self,
        query: &'a str,
        _credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Option<Location>>> {
        Box::pin(self.search(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(json: &str) -> Vec<NominatimPlace> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn first_result_truncated_name() {
        let places = parse(r#"[{"lat":"37.5","lon":"127.0","display_name":"Gangnam, Seoul, KR"}]"#);
        let loc = first_location(&places).unwrap().unwrap();
        assert_relative_eq!(loc.latitude(), 37.5);
        assert_relative_eq!(loc.longitude(), 127.0);
        assert_eq!(loc.display_name(), "Gangnam");
    }

    #[test]
    fn name_without_comma_kept_whole() {
        let places = parse(r#"[{"lat":"1","lon":"2","display_name":"Somewhere"}]"#);
        assert_eq!(
            first_location(&places).unwrap().unwrap().display_name(),
            "Somewhere"
        );
    }

    #[test]
    fn empty_list_is_none() {
        assert!(first_location(&parse("[]")).unwrap().is_none());
    }

    #[test]
    fn garbage_latitude_is_invalid() {
        let places = parse(r#"[{"lat":"abc","lon":"127.0","display_name":"x"}]"#);
        let err = first_location(&places).unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::InvalidLocation {
                provider: Provider::Nominatim,
                ..
            }
        ));
    }

    #[test]
    fn place_without_coordinates_is_transport() {
        let places = parse(r#"[{"display_name":"Gangnam, Seoul"}]"#);
        let err = first_location(&places).unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(
            err,
            GeocodeError::Transport {
                provider: Provider::Nominatim,
                ..
            }
        ));
    }
}
