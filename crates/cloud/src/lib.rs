//! # bimgis Cloud
//!
//! Geocoding for the site map: a V-World parcel/address client, an
//! OpenStreetMap Nominatim client, and the [`Resolver`] that cascades from
//! the first to the second.
//!
//! ## Features
//!
//! - `native` (default): Blocking API via tokio `block_on`

pub mod auth;
pub mod error;
pub mod http;
pub mod nominatim;
pub mod provider;
pub mod resolver;
pub mod vworld;

pub mod sync_api;

pub use error::{GeocodeError, Result};
pub use provider::{Geocoder, Provider};
pub use resolver::{Resolver, ResolverOptions};

/// Blocking API re-exported as `blocking` module (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
