//! Layer composition policy.
//!
//! [`compose`] is a pure function of the credential and the user's layer
//! preferences. Callers re-run it after any input changes and hand the result
//! to [`LayerRegistry::apply`](crate::registry::LayerRegistry::apply), which
//! rebuilds the whole stack.

use bimgis_core::{BaseLayerChoice, Credential, OverlayState};

use crate::source::SourceId;

/// Z-index of the base layer.
pub const BASE_Z: i32 = 1;
/// Z-index of the cadastral overlay, between base and labels.
pub const CADASTRAL_Z: i32 = 10;
/// Z-index of the satellite label overlay, always topmost.
pub const LABELS_Z: i32 = 20;

/// One entry of a composed layer stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSlot {
    pub source: SourceId,
    pub z_index: i32,
    pub opacity: f64,
}

impl LayerSlot {
    fn opaque(source: SourceId, z_index: i32) -> Self {
        Self {
            source,
            z_index,
            opacity: 1.0,
        }
    }
}

fn base_source(choice: BaseLayerChoice) -> SourceId {
    match choice {
        BaseLayerChoice::OpenMap => SourceId::OpenMap,
        BaseLayerChoice::ProviderMap => SourceId::ProviderMap,
        BaseLayerChoice::ProviderSatellite => SourceId::ProviderSatellite,
    }
}

/// Compose the ordered layer stack, in attach order.
///
/// Without a credential the result is exactly `[OpenMap(z=1)]`. With one:
/// the effective base at z=1, then the cadastral overlay at z=10 if enabled,
/// then the satellite labels at z=20 when the base is satellite. Labels are
/// attached last so they stay above the parcel lines.
pub fn compose(
    credential: &Credential,
    base_choice: BaseLayerChoice,
    overlay: &OverlayState,
) -> Vec<LayerSlot> {
    let base = base_choice.effective(credential);
    let mut stack = vec![LayerSlot::opaque(base_source(base), BASE_Z)];

    if !credential.is_present() {
        return stack;
    }

    if overlay.enabled {
        stack.push(LayerSlot {
            source: SourceId::ProviderCadastral,
            z_index: CADASTRAL_Z,
            opacity: overlay.opacity(),
        });
    }

    if base == BaseLayerChoice::ProviderSatellite {
        stack.push(LayerSlot::opaque(SourceId::ProviderLabels, LABELS_Z));
    }

    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn overlays() -> Vec<OverlayState> {
        vec![
            OverlayState::new(true, 0.5).unwrap(),
            OverlayState::new(false, 0.5).unwrap(),
            OverlayState::new(true, 0.0).unwrap(),
        ]
    }

    fn sources(stack: &[LayerSlot]) -> Vec<(SourceId, i32)> {
        stack.iter().map(|s| (s.source, s.z_index)).collect()
    }

    #[test]
    fn no_credential_is_only_open_map() {
        for base in BaseLayerChoice::ALL {
            for overlay in overlays() {
                let stack = compose(&Credential::none(), base, &overlay);
                assert_eq!(sources(&stack), vec![(SourceId::OpenMap, BASE_Z)]);
                assert!(stack.iter().all(|s| !s.source.is_provider()));
            }
        }
    }

    #[test]
    fn satellite_with_overlay_order() {
        let overlay = OverlayState::new(true, 0.5).unwrap();
        let stack = compose(
            &Credential::new("k"),
            BaseLayerChoice::ProviderSatellite,
            &overlay,
        );
        assert_eq!(
            sources(&stack),
            vec![
                (SourceId::ProviderSatellite, 1),
                (SourceId::ProviderCadastral, 10),
                (SourceId::ProviderLabels, 20),
            ]
        );
        assert_relative_eq!(stack[1].opacity, 0.5);
    }

    #[test]
    fn provider_map_without_overlay() {
        let overlay = OverlayState::new(false, 0.7).unwrap();
        let stack = compose(&Credential::new("k"), BaseLayerChoice::ProviderMap, &overlay);
        assert_eq!(sources(&stack), vec![(SourceId::ProviderMap, 1)]);
    }

    #[test]
    fn open_map_with_key_still_gets_cadastral() {
        let stack = compose(
            &Credential::new("k"),
            BaseLayerChoice::OpenMap,
            &OverlayState::default(),
        );
        assert_eq!(
            sources(&stack),
            vec![(SourceId::OpenMap, 1), (SourceId::ProviderCadastral, 10)]
        );
    }

    #[test]
    fn exactly_one_base_layer() {
        let key = Credential::new("k");
        for base in BaseLayerChoice::ALL {
            for overlay in overlays() {
                let stack = compose(&key, base, &overlay);
                let bases = stack.iter().filter(|s| s.z_index == BASE_Z).count();
                assert_eq!(bases, 1);
                assert_eq!(stack[0].z_index, BASE_Z);
            }
        }
    }

    #[test]
    fn compose_is_deterministic() {
        let key = Credential::new("k");
        let overlay = OverlayState::default();
        for base in BaseLayerChoice::ALL {
            assert_eq!(compose(&key, base, &overlay), compose(&key, base, &overlay));
        }
    }
}
