//! bimgis CLI - site map layers and address search from the terminal

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bimgis_cloud::blocking::{current_thread_runtime, ResolverBlocking};
use bimgis_cloud::{Resolver, ResolverOptions};
use bimgis_core::crs::tile_for_lonlat;
use bimgis_core::{BaseLayerChoice, Credential, FileSettings, OverlayState, SettingsStore};
use bimgis_map::{
    compose, LayerRegistry, MapPanel, Notice, PanelDefaults, PanelError, RecordingSurface,
    SurfaceCommand, SyncEvent,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bimgis")]
#[command(author, version, about = "Site map layers and address search", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file holding the V-World API key
    #[arg(long, global = true, default_value = "bimgis-settings.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the V-World API key
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },
    /// Resolve an address and print the location
    Geocode {
        /// Free-text address, parcel or place name
        query: String,
    },
    /// Resolve an address and move the site map to it
    Search {
        /// Free-text address, parcel or place name
        query: String,
        /// Print every map command, not only the final view
        #[arg(long)]
        trace: bool,
    },
    /// Show the composed layer stack
    Layers {
        #[command(flatten)]
        layers: LayerArgs,
    },
    /// Move the site map to a location pushed by the building model
    Sync {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true, required_unless_present = "demo")]
        lat: Option<f64>,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true, required_unless_present = "demo")]
        lng: Option<f64>,
        /// Site label
        #[arg(long, default_value = "")]
        label: String,
        /// Use the bundled demo model's site
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        demo: bool,
    },
    /// Print tile URLs of the composed stack for one point
    Tile {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Zoom level
        #[arg(long, default_value = "17")]
        zoom: u8,
        #[command(flatten)]
        layers: LayerArgs,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Store a key
    Set {
        /// API key (format is not checked)
        key: String,
    },
    /// Show whether a key is stored
    Show,
    /// Remove the stored key
    Clear,
}

#[derive(clap::Args)]
struct LayerArgs {
    /// Base map: osm, vworld_base, vworld_sat
    #[arg(long, default_value = "vworld_base")]
    base: BaseLayerChoice,
    /// Hide the cadastral overlay
    #[arg(long)]
    no_overlay: bool,
    /// Cadastral overlay opacity (0-1)
    #[arg(long, default_value = "0.7")]
    opacity: f64,
}

impl LayerArgs {
    fn overlay(&self) -> Result<OverlayState> {
        OverlayState::new(!self.no_overlay, self.opacity).context("Invalid overlay opacity")
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_key(settings: &FileSettings) -> Result<Credential> {
    settings
        .load()
        .with_context(|| format!("Failed to read settings {}", settings.path().display()))
}

fn masked(key: &Credential) -> String {
    let raw = key.expose();
    let head: String = raw.chars().take(4).collect();
    if raw.chars().count() > 4 {
        format!("{}…", head)
    } else {
        "*".repeat(raw.chars().count())
    }
}

fn open_panel(settings: FileSettings) -> Result<MapPanel<FileSettings, RecordingSurface>> {
    let resolver = Resolver::new(ResolverOptions::default()).context("Failed to build resolver")?;
    let mut panel = MapPanel::new(settings, resolver, PanelDefaults::default())
        .context("Failed to open site map")?;
    panel.mount(RecordingSurface::new());
    Ok(panel)
}

/// Turn a panel failure into the message shown to the user.
fn notice_error(err: PanelError) -> anyhow::Error {
    match Notice::for_error(&err) {
        Some(notice) => anyhow!(notice.message),
        None => anyhow!("Nothing to search for"),
    }
}

fn print_commands(commands: &[SurfaceCommand]) {
    for cmd in commands {
        match cmd {
            SurfaceCommand::Create(init) => println!(
                "  create     center=({:.6}, {:.6}) zoom={} crs={}",
                init.center.0, init.center.1, init.zoom, init.crs
            ),
            SurfaceCommand::Dispose => println!("  dispose"),
            SurfaceCommand::AddLayer {
                id,
                z_index,
                opacity,
            } => println!("  add-layer  {} z={} opacity={:.2}", id, z_index, opacity),
            SurfaceCommand::RemoveLayer(id) => println!("  remove     {}", id),
            SurfaceCommand::UpdateLayer { id, opacity } => {
                println!("  update     {} opacity={:.2}", id, opacity)
            }
            SurfaceCommand::FlyTo { center, zoom } => println!(
                "  fly-to     ({:.6}, {:.6}) zoom={}",
                center.0, center.1, zoom
            ),
            SurfaceCommand::ZoomBy(d) => println!("  zoom-by    {:+}", d),
            SurfaceCommand::AddMarker(at) => println!("  marker     ({:.6}, {:.6})", at.0, at.1),
            SurfaceCommand::MoveMarker(to) => {
                println!("  move       ({:.6}, {:.6})", to.0, to.1)
            }
            SurfaceCommand::OpenPopup(_) => println!("  popup"),
            SurfaceCommand::InvalidateSize(d) => println!("  resize     after {:?}", d),
        }
    }
}

fn print_view(panel: &MapPanel<FileSettings, RecordingSurface>) {
    let state = panel.viewport().state();
    let (lat, lng) = state.center.lat_lng();
    println!("Site: {}", state.center.display_name());
    println!("  Center: ({:.6}, {:.6})", lat, lng);
    println!("  Zoom: {}", state.zoom);
    if let Some(map) = panel.viewport().map() {
        let layers: Vec<String> = map.layers().iter().map(|l| l.to_string()).collect();
        println!("  Layers: {}", layers.join(" < "));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let settings = FileSettings::new(&cli.settings);

    match cli.command {
        // ── Key ──────────────────────────────────────────────────────
        Commands::Key { action } => {
            let mut settings = settings;
            match action {
                KeyCommands::Set { key } => {
                    settings
                        .save(&Credential::new(key))
                        .context("Failed to write settings")?;
                    println!("API key saved to: {}", cli.settings.display());
                }
                KeyCommands::Show => {
                    let key = load_key(&settings)?;
                    if key.is_present() {
                        println!("API key: {}", masked(&key));
                    } else {
                        println!("No API key stored; using OpenStreetMap only.");
                    }
                }
                KeyCommands::Clear => {
                    settings
                        .save(&Credential::none())
                        .context("Failed to write settings")?;
                    println!("API key cleared.");
                }
            }
        }

        // ── Geocode ──────────────────────────────────────────────────
        Commands::Geocode { query } => {
            let key = load_key(&settings)?;
            let resolver = ResolverBlocking::new(ResolverOptions::default())
                .context("Failed to build resolver")?;
            let plan: Vec<String> = resolver.plan(&key).iter().map(|p| p.to_string()).collect();
            info!("Providers: {}", plan.join(" -> "));

            let pb = spinner("Searching...");
            let start = Instant::now();
            let result = resolver.resolve(&query, &key);
            pb.finish_and_clear();
            let location = result.with_context(|| format!("Failed to resolve '{}'", query))?;

            println!("{}", location.display_name());
            println!(
                "  Lat/Lng: {:.6}, {:.6}",
                location.latitude(),
                location.longitude()
            );
            println!("  Lookup time: {:.2?}", start.elapsed());
        }

        // ── Search ───────────────────────────────────────────────────
        Commands::Search { query, trace } => {
            let mut panel = open_panel(settings)?;
            let rt = current_thread_runtime().context("Failed to start runtime")?;

            let pb = spinner("Searching...");
            let result = rt.block_on(panel.search(&query));
            pb.finish_and_clear();
            result.map_err(notice_error)?;

            if trace {
                if let Some(map) = panel.viewport().map() {
                    println!("Map commands:");
                    print_commands(map.commands());
                }
            }
            print_view(&panel);
        }

        // ── Layers ───────────────────────────────────────────────────
        Commands::Layers { layers } => {
            let key = load_key(&settings)?;
            let overlay = layers.overlay()?;
            let effective = layers.base.effective(&key);
            if effective != layers.base {
                println!(
                    "No API key stored: {} falls back to {}",
                    layers.base.label(),
                    effective.label()
                );
            }
            println!("Layer stack (bottom to top):");
            for slot in compose(&key, layers.base, &overlay) {
                println!(
                    "  z={:<3} {:<20} opacity={:.2} ({})",
                    slot.z_index,
                    slot.source.to_string(),
                    slot.opacity,
                    slot.source.attribution()
                );
            }
        }

        // ── Sync ─────────────────────────────────────────────────────
        Commands::Sync {
            lat,
            lng,
            label,
            demo,
        } => {
            let event = match (demo, lat, lng) {
                (true, _, _) => SyncEvent::demo(),
                (false, Some(latitude), Some(longitude)) => SyncEvent {
                    latitude,
                    longitude,
                    label,
                },
                _ => return Err(anyhow!("--lat and --lng are required without --demo")),
            };
            let mut panel = open_panel(settings)?;
            let label = panel.sync_from_model(event).map_err(notice_error)?;
            info!("Search box: {}", label);
            print_view(&panel);
        }

        // ── Tile ─────────────────────────────────────────────────────
        Commands::Tile {
            lat,
            lng,
            zoom,
            layers,
        } => {
            if zoom > bimgis_map::MAX_ZOOM {
                return Err(anyhow!(
                    "Zoom {} is above the maximum of {}",
                    zoom,
                    bimgis_map::MAX_ZOOM
                ));
            }
            let key = load_key(&settings)?;
            let overlay = layers.overlay()?;
            let tile = tile_for_lonlat(lng, lat, zoom);
            println!("Tile z={} x={} y={}", tile.z, tile.x, tile.y);

            let mut registry = LayerRegistry::new("localhost");
            let mut surface = RecordingSurface::new();
            registry.apply(&mut surface, &key, &compose(&key, layers.base, &overlay));
            for handle in registry.attached_handles() {
                println!("  {:<20} {}", handle.id().to_string(), handle.source().tile_url(tile));
            }
        }
    }

    Ok(())
}
