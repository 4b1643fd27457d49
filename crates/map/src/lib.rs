//! # bimgis Map
//!
//! The site map engine. It decides which tile and overlay layers are shown,
//! keeps one layer object per source and credential, and drives a single map
//! instance through a [`MapSurface`].
//!
//! ```text
//! settings ──► compose() ──► LayerRegistry::apply() ──► MapSurface
//! search   ──► Resolver  ──► ViewportController     ──► MapSurface
//! ```
//!
//! [`MapPanel`] wires these together behind explicit event handlers.

pub mod compose;
pub mod panel;
pub mod registry;
pub mod source;
pub mod surface;
pub mod viewport;

pub use compose::{compose, LayerSlot};
pub use panel::{MapPanel, Notice, PanelDefaults, PanelError, SearchRequest, Severity, SyncEvent};
pub use registry::{LayerHandle, LayerRegistry};
pub use source::{SourceId, TileSource, WmsParams, MAX_ZOOM};
pub use surface::{MapSurface, RecordingSurface, SurfaceCommand};
pub use viewport::{ViewportController, ViewportOptions, ViewportPhase, ViewportState};
