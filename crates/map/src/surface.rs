//! The rendering capability the engine drives.
//!
//! A [`MapSurface`] is one map instance bound to a display container. The
//! engine never draws anything itself; it only issues these commands.

use std::time::Duration;

use bimgis_core::CRS;
use tracing::debug;

use crate::registry::LayerHandle;
use crate::source::SourceId;

/// WGS-84 `(latitude, longitude)`.
pub type LatLng = (f64, f64);

/// Initial view passed when a map instance is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MapInit {
    pub center: LatLng,
    pub zoom: u8,
    pub crs: CRS,
    pub zoom_control: bool,
    pub attribution_control: bool,
}

/// Animated pan/zoom parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyOptions {
    pub duration: Duration,
    pub ease_linearity: f64,
}

/// Marker icon as an HTML/SVG snippet with pixel size and anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub html: String,
    pub size: (u32, u32),
    pub anchor: (u32, u32),
}

/// Map rendering capability.
pub trait MapSurface {
    /// Create the map bound to the container.
    fn create(&mut self, init: &MapInit);

    /// Dispose the map and everything attached to it.
    fn dispose(&mut self);

    /// Attach a layer; the handle carries source, z-index and opacity.
    fn add_layer(&mut self, layer: &LayerHandle);

    fn remove_layer(&mut self, id: SourceId);

    /// Push new opacity/params of an already attached layer.
    fn update_layer(&mut self, layer: &LayerHandle);

    fn fly_to(&mut self, center: LatLng, zoom: u8, options: FlyOptions);

    /// Change zoom by `delta` steps around the current center.
    fn zoom_by(&mut self, delta: i8);

    fn add_marker(&mut self, at: LatLng, icon: &MarkerIcon);

    fn move_marker(&mut self, to: LatLng);

    /// Replace the marker popup content and open it.
    fn open_popup(&mut self, html: &str);

    /// Ask the map to re-measure its container after `delay`.
    fn schedule_invalidate_size(&mut self, delay: Duration);
}

/// One command received by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Create(MapInit),
    Dispose,
    AddLayer { id: SourceId, z_index: i32, opacity: f64 },
    RemoveLayer(SourceId),
    UpdateLayer { id: SourceId, opacity: f64 },
    FlyTo { center: LatLng, zoom: u8 },
    ZoomBy(i8),
    AddMarker(LatLng),
    MoveMarker(LatLng),
    OpenPopup(String),
    InvalidateSize(Duration),
}

/// Surface that records commands and tracks the resulting map state.
///
/// Used headless by the command line and in tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<SurfaceCommand>,
    live: bool,
    layers: Vec<(SourceId, i32)>,
    markers: Vec<LatLng>,
    popup: Option<String>,
    center: Option<LatLng>,
    zoom: Option<u8>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    /// Drain recorded commands.
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Attached layers in draw order (lowest z first, ties by attach order).
    pub fn layers(&self) -> Vec<SourceId> {
        let mut layers = self.layers.clone();
        layers.sort_by_key(|(_, z)| *z);
        layers.into_iter().map(|(id, _)| id).collect()
    }

    /// Attached layers in attach order.
    pub fn attach_order(&self) -> Vec<SourceId> {
        self.layers.iter().map(|(id, _)| *id).collect()
    }

    pub fn markers(&self) -> &[LatLng] {
        &self.markers
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    pub fn zoom(&self) -> Option<u8> {
        self.zoom
    }

    fn record(&mut self, cmd: SurfaceCommand) {
        debug!(?cmd, "surface command");
        self.commands.push(cmd);
    }
}

impl MapSurface for RecordingSurface {
    fn create(&mut self, init: &MapInit) {
        self.live = true;
        self.center = Some(init.center);
        self.zoom = Some(init.zoom);
        self.record(SurfaceCommand::Create(init.clone()));
    }

    fn dispose(&mut self) {
        self.live = false;
        self.layers.clear();
        self.markers.clear();
        self.popup = None;
        self.record(SurfaceCommand::Dispose);
    }

    fn add_layer(&mut self, layer: &LayerHandle) {
        self.layers.retain(|(id, _)| *id != layer.id());
        self.layers.push((layer.id(), layer.z_index()));
        self.record(SurfaceCommand::AddLayer {
            id: layer.id(),
            z_index: layer.z_index(),
            opacity: layer.opacity(),
        });
    }

    fn remove_layer(&mut self, id: SourceId) {
        self.layers.retain(|(l, _)| *l != id);
        self.record(SurfaceCommand::RemoveLayer(id));
    }

    fn update_layer(&mut self, layer: &LayerHandle) {
        self.record(SurfaceCommand::UpdateLayer {
            id: layer.id(),
            opacity: layer.opacity(),
        });
    }

    fn fly_to(&mut self, center: LatLng, zoom: u8, _options: FlyOptions) {
        self.center = Some(center);
        self.zoom = Some(zoom);
        self.record(SurfaceCommand::FlyTo { center, zoom });
    }

    fn zoom_by(&mut self, delta: i8) {
        if let Some(z) = self.zoom {
            self.zoom = Some((z as i16 + delta as i16).clamp(0, crate::source::MAX_ZOOM as i16) as u8);
        }
        self.record(SurfaceCommand::ZoomBy(delta));
    }

    fn add_marker(&mut self, at: LatLng, _icon: &MarkerIcon) {
        self.markers.push(at);
        self.record(SurfaceCommand::AddMarker(at));
    }

    fn move_marker(&mut self, to: LatLng) {
        if let Some(m) = self.markers.last_mut() {
            *m = to;
        }
        self.record(SurfaceCommand::MoveMarker(to));
    }

    fn open_popup(&mut self, html: &str) {
        self.popup = Some(html.to_string());
        self.record(SurfaceCommand::OpenPopup(html.to_string()));
    }

    fn schedule_invalidate_size(&mut self, delay: Duration) {
        self.record(SurfaceCommand::InvalidateSize(delay));
    }
}
