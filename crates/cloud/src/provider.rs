//! Geocoding provider abstraction.

use std::fmt;

use bimgis_core::{Credential, Location};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{GeocodeError, Result};

/// Known geocoding services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// V-World search API (Korean parcel/address search, key required).
    VWorld,
    /// OpenStreetMap Nominatim (free text, no key).
    Nominatim,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VWorld => f.write_str("V-World"),
            Self::Nominatim => f.write_str("OSM Nominatim"),
        }
    }
}

/// A service that turns free text into a location.
///
/// `Ok(None)` means the provider answered but had no usable item. Malformed
/// coordinates are `Err(InvalidLocation)`; network and decoding problems are
/// `Err(Transport)`.
pub trait Geocoder: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether this provider can be queried with `credential`.
    fn is_available(&self, credential: &Credential) -> bool;

    fn geocode<'a>(
        &'a self,
        query: &'a str,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Option<Location>>>;
}

/// A coordinate as providers send it: JSON number or numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Number(f64),
    Text(String),
}

impl Coord {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Build a location from coordinates the provider did send, rejecting
/// anything unparseable or non-finite. Callers decide what a missing
/// coordinate means.
pub(crate) fn location_from_coords(
    provider: Provider,
    latitude: &Coord,
    longitude: &Coord,
    name: &str,
) -> Result<Location> {
    let invalid = || GeocodeError::InvalidLocation {
        provider,
        latitude: latitude.as_text(),
        longitude: longitude.as_text(),
    };

    match (latitude, longitude) {
        (Coord::Number(lat), Coord::Number(lng)) => {
            Location::new(*lat, *lng, name).map_err(|_| invalid())
        }
        (lat, lng) => {
            Location::parse(&lat.as_text(), &lng.as_text(), name).map_err(|_| invalid())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn coord_accepts_number_and_string() {
        let a: Coord = serde_json::from_str("37.5").unwrap();
        let b: Coord = serde_json::from_str("\"127.0\"").unwrap();
        let loc = location_from_coords(Provider::VWorld, &a, &b, "x").unwrap();
        assert_relative_eq!(loc.latitude(), 37.5);
        assert_relative_eq!(loc.longitude(), 127.0);
    }

    #[test]
    fn non_finite_coordinate_is_invalid() {
        let a = Coord::Number(37.5);
        let b = Coord::Text("inf".into());
        let err = location_from_coords(Provider::Nominatim, &a, &b, "x").unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::InvalidLocation { ref longitude, .. } if longitude == "inf"
        ));
    }
}
