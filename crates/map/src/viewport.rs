//! Viewport controller: the single map instance, its marker, and animated
//! moves between locations.

use std::time::Duration;

use bimgis_core::{Location, CRS};
use tracing::{debug, info};

use crate::source::MAX_ZOOM;
use crate::surface::{FlyOptions, LatLng, MapInit, MapSurface, MarkerIcon};

/// Configuration for [`ViewportController`].
#[derive(Debug, Clone)]
pub struct ViewportOptions {
    /// Location shown when the map is first mounted.
    pub initial: Location,
    pub initial_zoom: u8,
    /// Zoom used when flying to a submitted location.
    pub target_zoom: u8,
    pub fly: FlyOptions,
    /// Delay before the forced container re-measure after mounting.
    pub resize_delay: Duration,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            initial: Location::default(),
            initial_zoom: 17,
            target_zoom: 18,
            fly: FlyOptions {
                duration: Duration::from_millis(1500),
                ease_linearity: 0.25,
            },
            resize_delay: Duration::from_millis(100),
        }
    }
}

/// Animation state of the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportPhase {
    Idle,
    Transitioning { target: LatLng },
}

/// Observable viewport state. `marker_position` always equals the center
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub center: Location,
    pub zoom: u8,
    pub marker_position: Option<LatLng>,
}

/// Pin icon used for the site marker.
pub fn site_marker_icon() -> MarkerIcon {
    let svg = concat!(
        r##"<svg width="40" height="40" viewBox="0 0 24 24" fill="none" stroke="#ef4444" "##,
        r#"stroke-width="2" stroke-linecap="round" stroke-linejoin="round" "#,
        r#"xmlns="http://www.w3.org/2000/svg">"#,
        r#"<path d="M21 10c0 7-9 13-9 13s-9-6-9-13a9 9 0 0 1 18 0z"></path>"#,
        r#"<circle cx="12" cy="10" r="3"></circle></svg>"#,
    );
    MarkerIcon {
        html: format!(
            r#"<div style="transform: translate(-50%, -100%); filter: drop-shadow(0 4px 6px rgba(0,0,0,0.3));">{svg}</div>"#
        ),
        size: (40, 40),
        anchor: (20, 40),
    }
}

/// Popup HTML for a site name. The name is HTML-escaped.
pub fn popup_content(name: &str) -> String {
    format!(
        concat!(
            r#"<div class="text-sm font-sans">"#,
            r#"<div class="font-bold text-slate-800 mb-1">Target Site</div>"#,
            r#"<div class="text-xs text-slate-600 border-t pt-1 border-slate-200">{}</div>"#,
            r#"<div class="text-[10px] text-blue-600 mt-1">BIM Project Location</div>"#,
            r#"</div>"#,
        ),
        escape_html(name)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Owns the live map instance and the single marker.
pub struct ViewportController<M: MapSurface> {
    options: ViewportOptions,
    map: Option<M>,
    current: Location,
    zoom: u8,
    marker: Option<LatLng>,
    phase: ViewportPhase,
}

impl<M: MapSurface> ViewportController<M> {
    pub fn new(options: ViewportOptions) -> Self {
        let current = options.initial.clone();
        let zoom = options.initial_zoom;
        Self {
            options,
            map: None,
            current,
            zoom,
            marker: None,
            phase: ViewportPhase::Idle,
        }
    }

    /// Bind to a map container.
    ///
    /// Any previously mounted instance is disposed first. The new map opens
    /// at the current location with the marker placed and its popup open, and
    /// one container re-measure is scheduled.
    pub fn mount(&mut self, mut map: M) {
        self.unmount();

        let center = self.current.lat_lng();
        map.create(&MapInit {
            center,
            zoom: self.zoom,
            crs: CRS::web_mercator(),
            zoom_control: false,
            attribution_control: false,
        });
        map.add_marker(center, &site_marker_icon());
        map.open_popup(&popup_content(self.current.display_name()));
        map.schedule_invalidate_size(self.options.resize_delay);

        self.marker = Some(center);
        self.phase = ViewportPhase::Idle;
        self.map = Some(map);
        debug!(?center, zoom = self.zoom, "map mounted");
    }

    /// Dispose the live map, if any. Returns the disposed surface.
    pub fn unmount(&mut self) -> Option<M> {
        let mut map = self.map.take()?;
        map.dispose();
        self.marker = None;
        self.phase = ViewportPhase::Idle;
        debug!("map disposed");
        Some(map)
    }

    /// Move the viewport and marker to `location`.
    ///
    /// Restarts the animation if one is running. Without a mounted map only
    /// the stored location changes.
    pub fn submit_location(&mut self, location: Location) {
        let target = location.lat_lng();
        info!(
            name = location.display_name(),
            lat = target.0,
            lng = target.1,
            "moving viewport"
        );
        self.current = location;
        self.zoom = self.options.target_zoom;

        let Some(map) = self.map.as_mut() else {
            return;
        };

        map.fly_to(target, self.zoom, self.options.fly);
        if self.marker.is_some() {
            map.move_marker(target);
        } else {
            map.add_marker(target, &site_marker_icon());
        }
        map.open_popup(&popup_content(self.current.display_name()));

        self.marker = Some(target);
        self.phase = ViewportPhase::Transitioning { target };
    }

    /// The running animation reached its target.
    pub fn animation_settled(&mut self) {
        self.phase = ViewportPhase::Idle;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(1);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(-1);
    }

    fn zoom_by(&mut self, delta: i8) {
        let next = (self.zoom as i16 + delta as i16).clamp(0, MAX_ZOOM as i16) as u8;
        if next == self.zoom {
            return;
        }
        if let Some(map) = self.map.as_mut() {
            map.zoom_by(delta);
            self.zoom = next;
        }
    }

    pub fn phase(&self) -> &ViewportPhase {
        &self.phase
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            center: self.current.clone(),
            zoom: self.zoom,
            marker_position: self.marker,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Option<&M> {
        self.map.as_ref()
    }

    pub fn map_mut(&mut self) -> Option<&mut M> {
        self.map.as_mut()
    }
}

impl<M: MapSurface> Drop for ViewportController<M> {
    fn drop(&mut self) {
        self.unmount();
    }
}
