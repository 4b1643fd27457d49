//! Error types for bimgis

use thiserror::Error;

/// Main error type for bimgis core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid location: latitude={latitude}, longitude={longitude}")]
    InvalidLocation { latitude: String, longitude: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for bimgis core operations
pub type Result<T> = std::result::Result<T, Error>;
