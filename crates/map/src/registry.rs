//! Per-credential cache of layer objects and the stack applied to the map.

use std::collections::HashMap;

use bimgis_core::Credential;
use tracing::debug;

use crate::compose::LayerSlot;
use crate::source::{SourceId, TileSource, MAX_ZOOM};
use crate::surface::MapSurface;

/// A constructed layer: one per [`SourceId`] and credential.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHandle {
    id: SourceId,
    source: TileSource,
    z_index: i32,
    opacity: f64,
    max_zoom: u8,
}

impl LayerHandle {
    fn new(id: SourceId, credential: &Credential, domain: &str) -> Self {
        Self {
            id,
            source: TileSource::for_id(id, credential, domain),
            z_index: 0,
            opacity: 1.0,
            max_zoom: MAX_ZOOM,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn attribution(&self) -> &'static str {
        self.id.attribution()
    }

    /// Rebind key, domain and opacity in place. Only the cadastral WMS layer
    /// supports this; other handles ignore the key and only take opacity.
    pub fn refresh_params(&mut self, credential: &Credential, domain: &str, opacity: f64) {
        if let TileSource::Wms { params, .. } = &mut self.source {
            params.key = credential.clone();
            params.domain = domain.to_string();
        }
        self.opacity = opacity;
    }
}

/// Lazily built layer objects keyed by source.
///
/// All handles are built for one credential. A different credential drops
/// the whole cache, since provider URLs embed the key.
pub struct LayerRegistry {
    domain: String,
    credential: Credential,
    handles: HashMap<SourceId, LayerHandle>,
    /// Sources currently attached to the map, in attach order.
    attached: Vec<SourceId>,
}

impl LayerRegistry {
    /// `domain` is the requesting host name sent with WMS requests.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            credential: Credential::none(),
            handles: HashMap::new(),
            attached: Vec::new(),
        }
    }

    /// Cached handle for `id`, constructing it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `id` is a provider source and `credential` is empty. The
    /// composition policy never asks for one in that case.
    pub fn get_or_create(&mut self, id: SourceId, credential: &Credential) -> &mut LayerHandle {
        if *credential != self.credential {
            self.handles.clear();
            self.credential = credential.clone();
        }
        let domain = &self.domain;
        self.handles.entry(id).or_insert_with(|| {
            debug!(source = %id, "constructing layer");
            LayerHandle::new(id, credential, domain)
        })
    }

    /// Detach every attached handle from `map`, keeping the cache.
    pub fn teardown_all(&mut self, map: &mut dyn MapSurface) {
        for id in self.attached.drain(..) {
            debug!(source = %id, "detaching layer");
            map.remove_layer(id);
        }
    }

    /// Detach everything and drop the cache if `credential` differs from the
    /// one the cached handles were built with.
    pub fn invalidate(&mut self, map: &mut dyn MapSurface, credential: &Credential) {
        if *credential != self.credential {
            self.teardown_all(map);
            self.handles.clear();
            self.credential = credential.clone();
            debug!("layer cache invalidated");
        }
    }

    /// Replace the attached stack with `stack`, in order.
    pub fn apply(&mut self, map: &mut dyn MapSurface, credential: &Credential, stack: &[LayerSlot]) {
        self.invalidate(map, credential);
        self.teardown_all(map);

        for slot in stack {
            let domain = self.domain.clone();
            let handle = self.get_or_create(slot.source, credential);
            handle.z_index = slot.z_index;
            handle.refresh_params(credential, &domain, slot.opacity);
            map.add_layer(handle);
            self.attached.push(slot.source);
        }
        debug!(layers = ?self.attached, "layer stack applied");
    }

    /// Update the attached cadastral layer's key and opacity without
    /// detaching anything. Returns `false` if it is not attached.
    pub fn refresh_cadastral(
        &mut self,
        map: &mut dyn MapSurface,
        credential: &Credential,
        opacity: f64,
    ) -> bool {
        if !self.attached.contains(&SourceId::ProviderCadastral) {
            return false;
        }
        let domain = self.domain.clone();
        match self.handles.get_mut(&SourceId::ProviderCadastral) {
            Some(handle) => {
                handle.refresh_params(credential, &domain, opacity);
                map.update_layer(handle);
                true
            }
            None => false,
        }
    }

    /// Sources currently attached, in attach order.
    pub fn snapshot(&self) -> &[SourceId] {
        &self.attached
    }

    pub fn get(&self, id: SourceId) -> Option<&LayerHandle> {
        self.handles.get(&id)
    }

    /// Attached handles in attach order.
    pub fn attached_handles(&self) -> impl Iterator<Item = &LayerHandle> {
        self.attached.iter().filter_map(|id| self.handles.get(id))
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::source::WmsParams;
    use crate::surface::{RecordingSurface, SurfaceCommand};
    use bimgis_core::{BaseLayerChoice, OverlayState};

    fn sat_stack(key: &Credential, opacity: f64) -> Vec<LayerSlot> {
        compose(
            key,
            BaseLayerChoice::ProviderSatellite,
            &OverlayState::new(true, opacity).unwrap(),
        )
    }

    #[test]
    fn get_or_create_caches() {
        let mut reg = LayerRegistry::new("localhost");
        let key = Credential::new("k");
        let first = reg.get_or_create(SourceId::ProviderMap, &key).clone();
        let second = reg.get_or_create(SourceId::ProviderMap, &key).clone();
        assert_eq!(first, second);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    #[should_panic(expected = "without a credential")]
    fn provider_layer_without_key_panics() {
        let mut reg = LayerRegistry::new("localhost");
        reg.get_or_create(SourceId::ProviderCadastral, &Credential::none());
    }

    #[test]
    fn apply_attaches_in_order() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        reg.apply(&mut map, &key, &sat_stack(&key, 0.5));

        assert_eq!(
            map.attach_order(),
            vec![
                SourceId::ProviderSatellite,
                SourceId::ProviderCadastral,
                SourceId::ProviderLabels
            ]
        );
        assert_eq!(reg.snapshot(), map.attach_order().as_slice());
    }

    #[test]
    fn apply_is_idempotent() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        let stack = sat_stack(&key, 0.5);
        reg.apply(&mut map, &key, &stack);
        let once = map.attach_order();
        reg.apply(&mut map, &key, &stack);
        assert_eq!(map.attach_order(), once);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn switching_base_detaches_previous() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        let overlay = OverlayState::new(false, 0.7).unwrap();

        reg.apply(&mut map, &key, &compose(&key, BaseLayerChoice::ProviderSatellite, &overlay));
        reg.apply(&mut map, &key, &compose(&key, BaseLayerChoice::ProviderMap, &overlay));

        assert_eq!(map.layers(), vec![SourceId::ProviderMap]);
        // satellite and labels stay cached for the next switch
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn credential_change_rebuilds_cache() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let old = Credential::new("old");
        let new = Credential::new("new");

        reg.apply(&mut map, &old, &sat_stack(&old, 0.5));
        reg.apply(&mut map, &new, &sat_stack(&new, 0.5));

        let TileSource::Xyz { template, .. } = reg.get(SourceId::ProviderSatellite).unwrap().source()
        else {
            panic!("satellite should be XYZ");
        };
        assert!(template.contains("/new/"));
        assert!(!template.contains("/old/"));
    }

    #[test]
    fn clearing_credential_leaves_open_map_only() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        reg.apply(&mut map, &key, &sat_stack(&key, 0.5));

        let none = Credential::none();
        reg.apply(&mut map, &none, &sat_stack(&none, 0.5));
        assert_eq!(map.layers(), vec![SourceId::OpenMap]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn cadastral_refreshed_in_place() {
        let mut reg = LayerRegistry::new("example.org");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        reg.apply(&mut map, &key, &sat_stack(&key, 0.5));
        map.take_commands();

        assert!(reg.refresh_cadastral(&mut map, &key, 0.2));
        assert_eq!(
            map.take_commands(),
            vec![SurfaceCommand::UpdateLayer {
                id: SourceId::ProviderCadastral,
                opacity: 0.2
            }]
        );
        let handle = reg.get(SourceId::ProviderCadastral).unwrap();
        let TileSource::Wms { params, .. } = handle.source() else {
            panic!("cadastral should be WMS");
        };
        assert_eq!(params, &WmsParams::cadastral(&key, "example.org"));
    }

    #[test]
    fn refresh_without_attached_cadastral_is_noop() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        assert!(!reg.refresh_cadastral(&mut map, &key, 0.3));
        assert!(map.commands().is_empty());
    }

    #[test]
    fn teardown_keeps_cache() {
        let mut reg = LayerRegistry::new("localhost");
        let mut map = RecordingSurface::new();
        let key = Credential::new("k");
        reg.apply(&mut map, &key, &sat_stack(&key, 0.5));
        reg.teardown_all(&mut map);
        assert!(map.layers().is_empty());
        assert!(reg.snapshot().is_empty());
        assert_eq!(reg.len(), 3);
    }
}
