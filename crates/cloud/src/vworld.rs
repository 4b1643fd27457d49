//! V-World search API: structured parcel/address lookup.
//!
//! Requests are issued with `type=address&category=parcel` and a page size of
//! one, so only the first hit is ever considered.

use std::sync::Arc;

use bimgis_core::{Credential, Location};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::auth::KeyAuth;
use crate::error::Result;
use crate::http::HttpClient;
use crate::provider::{location_from_coords, Coord, Geocoder, Provider};

/// Default V-World search endpoint.
pub const VWORLD_SEARCH_URL: &str = "https://api.vworld.kr/req/search";

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

/// Top-level envelope: `{"response": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VWorldEnvelope {
    pub response: VWorldResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VWorldResponse {
    /// `OK`, `NOT_FOUND` or `ERROR`.
    pub status: String,
    #[serde(default)]
    pub result: Option<VWorldResult>,
    /// Present when `status == "ERROR"` (with `errorformat=json`).
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VWorldResult {
    #[serde(default)]
    pub items: Vec<VWorldItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VWorldItem {
    pub point: Option<VWorldPoint>,
    #[serde(default)]
    pub address: VWorldAddress,
}

/// Point in the requested CRS (EPSG:4326): `x` is longitude, `y` latitude.
#[derive(Debug, Clone, Deserialize)]
pub struct VWorldPoint {
    pub x: Option<Coord>,
    pub y: Option<Coord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VWorldAddress {
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub parcel: Option<String>,
}

impl VWorldAddress {
    /// Road name, else parcel designation, else `fallback`. Blank strings
    /// count as missing.
    pub fn preferred_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        [self.road.as_deref(), self.parcel.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
    }
}

impl VWorldEnvelope {
    /// Map the first result item to a location.
    ///
    /// Returns `Ok(None)` unless the status is `OK` and the first item carries
    /// both point coordinates. Coordinates that are present but unusable are
    /// `InvalidLocation`.
    pub fn first_location(&self, query: &str) -> Result<Option<Location>> {
        if self.response.status != "OK" {
            return Ok(None);
        }
        let Some(item) = self
            .response
            .result
            .as_ref()
            .and_then(|r| r.items.first())
        else {
            return Ok(None);
        };

        let Some((lat, lng)) = item
            .point
            .as_ref()
            .and_then(|p| p.y.as_ref().zip(p.x.as_ref()))
        else {
            debug!(query, "first item has no point, treating as no result");
            return Ok(None);
        };
        let name = item.address.preferred_name(query);
        location_from_coords(Provider::VWorld, lat, lng, name).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Primary geocoder, available only with a credential.
pub struct VWorldGeocoder {
    http: Arc<HttpClient>,
    search_url: String,
}

impl VWorldGeocoder {
    pub fn new(http: Arc<HttpClient>, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
        }
    }

    async fn search(&self, query: &str, credential: &Credential) -> Result<Option<Location>> {
        let params = [
            ("service", "search"),
            ("request", "search"),
            ("version", "2.0"),
            ("crs", "EPSG:4326"),
            ("size", "1"),
            ("page", "1"),
            ("query", query),
            ("type", "address"),
            ("category", "parcel"),
            ("format", "json"),
            ("errorformat", "json"),
        ];
        let envelope: VWorldEnvelope = self
            .http
            .get_json(
                Provider::VWorld,
                &self.search_url,
                &params,
                &KeyAuth::new(credential),
            )
            .await?;
        envelope.first_location(query)
    }
}

impl Geocoder for VWorldGeocoder {
    fn provider(&self) -> Provider {
        Provider::VWorld
    }

    fn is_available(&self, credential: &Credential) -> bool {
        credential.is_present()
    }

    fn geocode<'a>(
        &'a self,
        query: &'a str,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Option<Location>>> {
        Box::pin(self.search(query, credential))
    }
}
