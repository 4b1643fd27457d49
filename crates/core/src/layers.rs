//! User-facing layer preferences: base map choice and overlay settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::{Error, Result};

/// Which full-coverage background map to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseLayerChoice {
    /// OpenStreetMap tiles, always available.
    OpenMap,
    /// V-World 2D base map (credential required).
    ProviderMap,
    /// V-World satellite imagery (credential required).
    ProviderSatellite,
}

impl BaseLayerChoice {
    pub const ALL: [BaseLayerChoice; 3] = [
        BaseLayerChoice::OpenMap,
        BaseLayerChoice::ProviderMap,
        BaseLayerChoice::ProviderSatellite,
    ];

    /// Stable short name (`osm`, `vworld_base`, `vworld_sat`).
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenMap => "osm",
            Self::ProviderMap => "vworld_base",
            Self::ProviderSatellite => "vworld_sat",
        }
    }

    /// Human-readable label for menus.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenMap => "OpenStreetMap",
            Self::ProviderMap => "V-World 2D",
            Self::ProviderSatellite => "V-World Satellite",
        }
    }

    /// Whether this choice needs a provider credential.
    pub fn requires_credential(self) -> bool {
        !matches!(self, Self::OpenMap)
    }

    /// The choice actually rendered: provider choices fall back to
    /// [`BaseLayerChoice::OpenMap`] when no credential is present.
    pub fn effective(self, credential: &Credential) -> Self {
        if self.requires_credential() && !credential.is_present() {
            Self::OpenMap
        } else {
            self
        }
    }
}

impl fmt::Display for BaseLayerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BaseLayerChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "osm" | "openstreetmap" | "open" => Ok(Self::OpenMap),
            "vworld_base" | "vworld" | "base" | "2d" => Ok(Self::ProviderMap),
            "vworld_sat" | "satellite" | "sat" => Ok(Self::ProviderSatellite),
            other => Err(Error::InvalidParameter {
                name: "base_layer",
                value: other.to_string(),
                reason: "expected osm, vworld_base or vworld_sat".into(),
            }),
        }
    }
}

/// Cadastral overlay toggle and opacity.
///
/// Only meaningful when a credential is present; rendering ignores it
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayState {
    pub enabled: bool,
    opacity: f64,
}

impl OverlayState {
    pub const DEFAULT_OPACITY: f64 = 0.7;

    /// Create an overlay state; opacity is clamped into `[0, 1]`.
    pub fn new(enabled: bool, opacity: f64) -> Result<Self> {
        Ok(Self {
            enabled,
            opacity: clamp_opacity(opacity)?,
        })
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f64) -> Result<()> {
        self.opacity = clamp_opacity(opacity)?;
        Ok(())
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: Self::DEFAULT_OPACITY,
        }
    }
}

fn clamp_opacity(opacity: f64) -> Result<f64> {
    if !opacity.is_finite() {
        return Err(Error::InvalidParameter {
            name: "opacity",
            value: opacity.to_string(),
            reason: "must be a finite number".into(),
        });
    }
    Ok(opacity.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_effective_without_credential() {
        let none = Credential::none();
        for choice in BaseLayerChoice::ALL {
            assert_eq!(choice.effective(&none), BaseLayerChoice::OpenMap);
        }
    }

    #[test]
    fn test_effective_with_credential() {
        let key = Credential::new("k");
        for choice in BaseLayerChoice::ALL {
            assert_eq!(choice.effective(&key), choice);
        }
    }

    #[test]
    fn test_parse_names() {
        for choice in BaseLayerChoice::ALL {
            assert_eq!(choice.name().parse::<BaseLayerChoice>().unwrap(), choice);
        }
        assert!("mars".parse::<BaseLayerChoice>().is_err());
    }

    #[test]
    fn test_overlay_opacity_clamped() {
        let mut o = OverlayState::new(true, 1.7).unwrap();
        assert_relative_eq!(o.opacity(), 1.0);
        o.set_opacity(-0.3).unwrap();
        assert_relative_eq!(o.opacity(), 0.0);
        assert!(o.set_opacity(f64::NAN).is_err());
        assert_relative_eq!(o.opacity(), 0.0);
    }

    #[test]
    fn test_overlay_default() {
        let o = OverlayState::default();
        assert!(o.enabled);
        assert_relative_eq!(o.opacity(), 0.7);
    }
}
