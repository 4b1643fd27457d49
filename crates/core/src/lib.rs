//! # bimgis Core
//!
//! Core types shared by the bimgis site-map crates.
//!
//! This crate provides:
//! - `Credential`: the provider access key and its redacted `Debug`
//! - `Location`: a named WGS-84 point with finite coordinates
//! - `BaseLayerChoice` / `OverlayState`: user layer preferences
//! - `SettingsStore`: persistence of the single key/value setting
//! - `CRS` and Web Mercator tile math

pub mod credential;
pub mod crs;
pub mod error;
pub mod layers;
pub mod location;
pub mod settings;

pub use credential::Credential;
pub use crs::{TileCoord, CRS};
pub use error::{Error, Result};
pub use layers::{BaseLayerChoice, OverlayState};
pub use location::Location;
pub use settings::{FileSettings, MemorySettings, SettingsStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::credential::Credential;
    pub use crate::error::{Error, Result};
    pub use crate::layers::{BaseLayerChoice, OverlayState};
    pub use crate::location::Location;
    pub use crate::settings::SettingsStore;
}
