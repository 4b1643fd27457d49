//! Coordinate reference systems and Web Mercator tile math

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Earth radius used by EPSG:3857 (metres).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Largest latitude representable in Web Mercator.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Coordinate Reference System, identified by EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// `EPSG:<code>`, as used in request parameters.
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// XYZ slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned box in EPSG:3857 metres: (min_x, min_y, max_x, max_y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MercatorBounds {
    /// `min_x,min_y,max_x,max_y`, the WMS 1.3.0 BBOX order for EPSG:3857.
    pub fn to_bbox_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Project WGS-84 lon/lat (degrees) to EPSG:3857 metres.
///
/// Latitude is clamped to the Mercator limit.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Tile containing a WGS-84 point at zoom `z`.
pub fn tile_for_lonlat(lon: f64, lat: f64, z: u8) -> TileCoord {
    let n = 2f64.powi(z as i32);
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let max = (n as u32).saturating_sub(1);

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();

    TileCoord {
        z,
        x: (x.max(0.0) as u32).min(max),
        y: (y.max(0.0) as u32).min(max),
    }
}

/// EPSG:3857 extent of a tile.
pub fn tile_bounds(tile: TileCoord) -> MercatorBounds {
    let extent = PI * EARTH_RADIUS;
    let size = 2.0 * extent / 2f64.powi(tile.z as i32);
    let min_x = -extent + tile.x as f64 * size;
    let max_y = extent - tile.y as f64 * size;
    MercatorBounds {
        min_x,
        min_y: max_y - size,
        max_x: min_x + size,
        max_y,
    }
}
