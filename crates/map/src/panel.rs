//! The site map panel: explicit event handlers tying settings, layers,
//! geocoding and the viewport together.
//!
//! Every handler that changes the credential or a layer preference re-runs
//! [`compose`] and re-applies the full stack.

use bimgis_cloud::{GeocodeError, Provider, Resolver};
use bimgis_core::{BaseLayerChoice, Credential, Location, OverlayState, SettingsStore};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compose::{compose, LayerSlot};
use crate::registry::LayerRegistry;
use crate::surface::MapSurface;
use crate::viewport::{ViewportController, ViewportOptions};

// ---------------------------------------------------------------------------
// Errors and notices
// ---------------------------------------------------------------------------

/// Errors returned by panel handlers.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("a search is already in progress")]
    Busy,

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Core(#[from] bimgis_core::Error),
}

/// How a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Modal; the user must acknowledge it.
    Blocking,
    /// Can be dismissed or ignored.
    Dismissible,
}

/// User-facing message for a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    /// Notice for `err`, or `None` if the failure should be silent (blank
    /// search text).
    pub fn for_error(err: &PanelError) -> Option<Self> {
        let (severity, message) = match err {
            PanelError::Busy => (
                Severity::Dismissible,
                "A search is already in progress.".to_string(),
            ),
            PanelError::Geocode(GeocodeError::EmptyQuery) => return None,
            PanelError::Geocode(GeocodeError::InvalidLocation { .. })
            | PanelError::Core(bimgis_core::Error::InvalidLocation { .. }) => {
                (Severity::Blocking, "Invalid coordinates received.".to_string())
            }
            PanelError::Geocode(GeocodeError::NotFound { query, attempted }) => {
                let via = if attempted.contains(&Provider::VWorld) {
                    "V-World"
                } else {
                    "OSM"
                };
                (
                    Severity::Dismissible,
                    format!(
                        "Location '{query}' not found via {via}.\nTry entering 'Dong + Bunji' format."
                    ),
                )
            }
            PanelError::Geocode(_) => (
                Severity::Dismissible,
                "Search failed. Please check network connection.".to_string(),
            ),
            PanelError::Core(e) => (Severity::Dismissible, e.to_string()),
        };
        Some(Self { severity, message })
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Location pushed by the building-model collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl SyncEvent {
    /// Site address of the bundled demo model.
    pub fn demo() -> Self {
        Self {
            latitude: 37.5126,
            longitude: 127.1025,
            label: "Seoul, Songpa-gu, Olympic-ro 300".to_string(),
        }
    }
}

/// A search accepted by [`MapPanel::begin_search`]; resolve it, then pass the
/// outcome to [`MapPanel::finish_search`].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub credential: Credential,
}

/// Clears the busy flag when an in-flight search ends, including when its
/// future is dropped.
struct BusyGuard<'a>(&'a mut bool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Initial layer preferences.
#[derive(Debug, Clone)]
pub struct PanelDefaults {
    pub base: BaseLayerChoice,
    pub overlay: OverlayState,
    /// Host name sent with cadastral WMS requests.
    pub domain: String,
    pub viewport: ViewportOptions,
}

impl Default for PanelDefaults {
    fn default() -> Self {
        Self {
            base: BaseLayerChoice::ProviderMap,
            overlay: OverlayState::default(),
            domain: "localhost".to_string(),
            viewport: ViewportOptions::default(),
        }
    }
}

/// Interactive site map.
pub struct MapPanel<S: SettingsStore, M: MapSurface> {
    settings: S,
    credential: Credential,
    base: BaseLayerChoice,
    overlay: OverlayState,
    registry: LayerRegistry,
    viewport: ViewportController<M>,
    resolver: Resolver,
    busy: bool,
}

impl<S: SettingsStore, M: MapSurface> MapPanel<S, M> {
    /// Load the credential and set up preferences. Without a credential the
    /// base preference starts at OpenMap.
    pub fn new(
        settings: S,
        resolver: Resolver,
        defaults: PanelDefaults,
    ) -> Result<Self, PanelError> {
        let credential = settings.load()?;
        let base = if credential.is_present() {
            defaults.base
        } else {
            BaseLayerChoice::OpenMap
        };
        debug!(?credential, %base, "panel created");
        Ok(Self {
            settings,
            credential,
            base,
            overlay: defaults.overlay,
            registry: LayerRegistry::new(defaults.domain),
            viewport: ViewportController::new(defaults.viewport),
            resolver,
            busy: false,
        })
    }

    /// Mount the map and attach the composed layers.
    pub fn mount(&mut self, map: M) {
        self.detach_layers();
        self.viewport.mount(map);
        self.refresh_layers();
    }

    /// Dispose the map.
    pub fn unmount(&mut self) -> Option<M> {
        self.detach_layers();
        self.viewport.unmount()
    }

    fn detach_layers(&mut self) {
        if let Some(map) = self.viewport.map_mut() {
            self.registry.teardown_all(map);
        }
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Persist a new credential and rebuild the layer stack.
    ///
    /// A non-empty key switches the base map to the provider map; an empty
    /// key falls back to OpenMap.
    pub fn save_credential(&mut self, credential: Credential) -> Result<(), PanelError> {
        self.settings.save(&credential)?;
        self.credential = credential;
        self.base = if self.credential.is_present() {
            BaseLayerChoice::ProviderMap
        } else {
            BaseLayerChoice::OpenMap
        };
        info!(present = self.credential.is_present(), base = %self.base, "credential saved");
        self.refresh_layers();
        Ok(())
    }

    // ── Layer preferences ───────────────────────────────────────────

    /// Select a base map. Provider choices are refused without a credential.
    pub fn select_base(&mut self, choice: BaseLayerChoice) -> bool {
        if choice.requires_credential() && !self.credential.is_present() {
            warn!(%choice, "provider base map needs an API key");
            return false;
        }
        self.base = choice;
        self.refresh_layers();
        true
    }

    pub fn toggle_overlay(&mut self) {
        self.overlay.toggle();
        self.refresh_layers();
    }

    /// Change cadastral opacity (clamped into `[0, 1]`).
    ///
    /// Opacity does not change which layers are composed, so the attached
    /// cadastral layer is updated in place and nothing is re-attached. When
    /// it is not attached the new value takes effect on the next recompose.
    pub fn set_overlay_opacity(&mut self, opacity: f64) -> Result<(), PanelError> {
        self.overlay.set_opacity(opacity)?;
        if let Some(map) = self.viewport.map_mut() {
            self.registry
                .refresh_cadastral(map, &self.credential, self.overlay.opacity());
        }
        Ok(())
    }

    /// Stack for the current credential and preferences.
    pub fn composed(&self) -> Vec<LayerSlot> {
        compose(&self.credential, self.base, &self.overlay)
    }

    fn refresh_layers(&mut self) {
        let stack = self.composed();
        if let Some(map) = self.viewport.map_mut() {
            self.registry.apply(map, &self.credential, &stack);
        }
    }

    // ── Location ────────────────────────────────────────────────────

    /// Accept a search. Fails with [`PanelError::Busy`] while another search
    /// is outstanding and with `EmptyQuery` for blank text.
    pub fn begin_search(&mut self, query: &str) -> Result<SearchRequest, PanelError> {
        if self.busy {
            return Err(PanelError::Busy);
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery.into());
        }
        self.busy = true;
        Ok(SearchRequest {
            query: query.to_string(),
            credential: self.credential.clone(),
        })
    }

    /// Apply a resolution outcome and clear the busy flag.
    ///
    /// Outcomes are applied in call order with no staleness check. On error
    /// the viewport and layers are left untouched.
    pub fn finish_search(
        &mut self,
        outcome: Result<Location, GeocodeError>,
    ) -> Result<Location, PanelError> {
        self.busy = false;
        let location = outcome?;
        self.viewport.submit_location(location.clone());
        Ok(location)
    }

    /// Resolve `query` and move the viewport to the result.
    ///
    /// Dropping the returned future before it completes abandons the search
    /// and clears the busy flag.
    pub async fn search(&mut self, query: &str) -> Result<Location, PanelError> {
        let request = self.begin_search(query)?;
        let outcome = {
            let _busy = BusyGuard(&mut self.busy);
            self.resolver
                .resolve(&request.query, &request.credential)
                .await
        };
        self.finish_search(outcome)
    }

    /// Apply a location pushed by the model collaborator. Returns the label
    /// for the caller's search box.
    pub fn sync_from_model(&mut self, event: SyncEvent) -> Result<String, PanelError> {
        let location = Location::new(event.latitude, event.longitude, event.label.clone())?;
        self.viewport.submit_location(location);
        Ok(event.label)
    }

    // ── Viewport passthrough ────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn animation_settled(&mut self) {
        self.viewport.animation_settled();
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn base(&self) -> BaseLayerChoice {
        self.base
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn viewport(&self) -> &ViewportController<M> {
        &self.viewport
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}
