//! Error types for geocoding.

use thiserror::Error;

use crate::provider::Provider;

/// Errors produced while resolving a free-text query to a location.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("empty search query")]
    EmptyQuery,

    #[error("location '{query}' not found via {}", provider_list(.attempted))]
    NotFound {
        query: String,
        attempted: Vec<Provider>,
    },

    #[error("{provider} returned invalid coordinates: lat={latitude:?}, lon={longitude:?}")]
    InvalidLocation {
        provider: Provider,
        latitude: String,
        longitude: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: Provider, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl GeocodeError {
    pub(crate) fn transport(provider: Provider, message: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            message: message.into(),
        }
    }

    /// Whether this failure came from the network or response decoding.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }
}

fn provider_list(providers: &[Provider]) -> String {
    if providers.is_empty() {
        return "no provider".to_string();
    }
    providers
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for geocoding operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_providers() {
        let err = GeocodeError::NotFound {
            query: "Samsung-dong 123-4".into(),
            attempted: vec![Provider::VWorld, Provider::Nominatim],
        };
        assert_eq!(
            err.to_string(),
            "location 'Samsung-dong 123-4' not found via V-World, OSM Nominatim"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(GeocodeError::transport(Provider::Nominatim, "timeout").is_transport());
        assert!(!GeocodeError::EmptyQuery.is_transport());
    }
}
