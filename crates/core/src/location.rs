//! Geographic locations shown on the site map.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named WGS-84 point.
///
/// Constructing through [`Location::new`] guarantees finite coordinates, so
/// anything holding a `Location` can hand it straight to the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    display_name: String,
}

impl Location {
    /// Create a location, rejecting NaN or infinite coordinates.
    pub fn new(latitude: f64, longitude: f64, display_name: impl Into<String>) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(Error::InvalidLocation {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
            display_name: display_name.into(),
        })
    }

    /// Create a location from textual coordinates as providers send them.
    ///
    /// Surrounding whitespace is ignored; anything `f64::from_str` rejects,
    /// or that parses to a non-finite value, is an `InvalidLocation`.
    pub fn parse(latitude: &str, longitude: &str, display_name: impl Into<String>) -> Result<Self> {
        let invalid = || Error::InvalidLocation {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        };
        let lat: f64 = latitude.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = longitude.trim().parse().map_err(|_| invalid())?;
        Self::new(lat, lng, display_name).map_err(|_| invalid())
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Coordinates as `(lat, lng)`.
    pub fn lat_lng(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl Location {
    pub const DEFAULT_LATITUDE: f64 = 37.570705;
    pub const DEFAULT_LONGITUDE: f64 = 126.976936;
    pub const DEFAULT_NAME: &'static str = "Gwanghwamun, Seoul";
}

/// Gwanghwamun, Seoul: where the site map opens before any search.
impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: Self::DEFAULT_LATITUDE,
            longitude: Self::DEFAULT_LONGITUDE,
            display_name: Self::DEFAULT_NAME.to_string(),
        }
    }
}
