//! Tile and overlay source definitions.
//!
//! Each [`SourceId`] maps to one remote endpoint. Provider sources bake the
//! credential into their URL or parameters at construction, which is why the
//! registry rebuilds them whenever the credential changes.

use std::fmt;

use bimgis_core::{Credential, TileCoord, CRS};
use reqwest::Url;

/// Highest zoom level served by every source.
pub const MAX_ZOOM: u8 = 19;

/// Edge length of a rendered tile in pixels.
pub const TILE_SIZE: u32 = 256;

pub const OSM_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];
pub const VWORLD_WMTS_BASE: &str = "https://api.vworld.kr/req/wmts/1.0.0";
pub const VWORLD_WMS_URL: &str = "https://api.vworld.kr/req/wms";

/// Cadastral parcel layers (partial and main lot boundaries).
pub const CADASTRAL_LAYERS: &str = "lp_pa_cbnd_bubun,lp_pa_cbnd_bonbun";

/// Stable identity of each distinct source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    OpenMap,
    ProviderMap,
    ProviderSatellite,
    /// Hybrid label overlay drawn over satellite imagery.
    ProviderLabels,
    /// Cadastral (parcel boundary) WMS overlay.
    ProviderCadastral,
}

impl SourceId {
    pub const ALL: [SourceId; 5] = [
        SourceId::OpenMap,
        SourceId::ProviderMap,
        SourceId::ProviderSatellite,
        SourceId::ProviderLabels,
        SourceId::ProviderCadastral,
    ];

    /// Whether the source needs a provider credential.
    pub fn is_provider(self) -> bool {
        !matches!(self, Self::OpenMap)
    }

    pub fn attribution(self) -> &'static str {
        match self {
            Self::OpenMap => "OSM",
            _ => "V-World",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OpenMap => "osm",
            Self::ProviderMap => "vworld_base",
            Self::ProviderSatellite => "vworld_sat",
            Self::ProviderLabels => "vworld_hybrid",
            Self::ProviderCadastral => "vworld_cadastral",
        };
        f.write_str(s)
    }
}

/// Parameters of the cadastral WMS overlay.
#[derive(Clone, PartialEq)]
pub struct WmsParams {
    pub layers: String,
    pub styles: String,
    pub format: String,
    pub transparent: bool,
    pub version: String,
    pub crs: CRS,
    pub key: Credential,
    /// Requesting host name; V-World checks it against the key's registration.
    pub domain: String,
}

impl fmt::Debug for WmsParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WmsParams")
            .field("layers", &self.layers)
            .field("version", &self.version)
            .field("crs", &self.crs)
            .field("key", &self.key)
            .field("domain", &self.domain)
            .finish()
    }
}

impl WmsParams {
    /// V-World cadastral parameters for `key` requested from `domain`.
    pub fn cadastral(key: &Credential, domain: &str) -> Self {
        Self {
            layers: CADASTRAL_LAYERS.to_string(),
            styles: CADASTRAL_LAYERS.to_string(),
            format: "image/png".to_string(),
            transparent: true,
            version: "1.3.0".to_string(),
            crs: CRS::web_mercator(),
            key: key.clone(),
            domain: domain.to_string(),
        }
    }

    /// Query pairs for a GetMap request, names upper-cased.
    pub fn query_pairs(&self, tile: TileCoord) -> Vec<(&'static str, String)> {
        let bbox = bimgis_core::crs::tile_bounds(tile);
        vec![
            ("SERVICE", "WMS".to_string()),
            ("REQUEST", "GetMap".to_string()),
            ("VERSION", self.version.clone()),
            ("LAYERS", self.layers.clone()),
            ("STYLES", self.styles.clone()),
            ("FORMAT", self.format.clone()),
            ("TRANSPARENT", self.transparent.to_string().to_uppercase()),
            ("CRS", self.crs.identifier()),
            ("KEY", self.key.expose().to_string()),
            ("DOMAIN", self.domain.clone()),
            ("WIDTH", TILE_SIZE.to_string()),
            ("HEIGHT", TILE_SIZE.to_string()),
            ("BBOX", bbox.to_bbox_param()),
        ]
    }
}

/// Where a layer's imagery comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSource {
    /// Slippy-map template with `{s}`, `{z}`, `{x}`, `{y}` placeholders.
    Xyz {
        template: String,
        subdomains: Vec<String>,
    },
    /// WMS endpoint rendered per tile bbox.
    Wms { base_url: String, params: WmsParams },
}

impl TileSource {
    /// Build the source for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is a provider source and `credential` is empty. Such a
    /// layer would only ever render broken tiles.
    pub fn for_id(id: SourceId, credential: &Credential, domain: &str) -> Self {
        assert!(
            !id.is_provider() || credential.is_present(),
            "provider source {id} constructed without a credential"
        );
        match id {
            SourceId::OpenMap => Self::Xyz {
                template: OSM_TEMPLATE.to_string(),
                subdomains: OSM_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            },
            SourceId::ProviderMap => vworld_wmts(credential, "Base", "png"),
            SourceId::ProviderSatellite => vworld_wmts(credential, "Satellite", "jpeg"),
            SourceId::ProviderLabels => vworld_wmts(credential, "Hybrid", "png"),
            SourceId::ProviderCadastral => Self::Wms {
                base_url: VWORLD_WMS_URL.to_string(),
                params: WmsParams::cadastral(credential, domain),
            },
        }
    }

    /// Concrete request URL for one tile.
    pub fn tile_url(&self, tile: TileCoord) -> String {
        match self {
            Self::Xyz {
                template,
                subdomains,
            } => {
                let s = if subdomains.is_empty() {
                    ""
                } else {
                    let idx = (tile.x as usize + tile.y as usize) % subdomains.len();
                    subdomains[idx].as_str()
                };
                template
                    .replace("{s}", s)
                    .replace("{z}", &tile.z.to_string())
                    .replace("{x}", &tile.x.to_string())
                    .replace("{y}", &tile.y.to_string())
            }
            Self::Wms { base_url, params } => match Url::parse(base_url) {
                Ok(mut url) => {
                    url.query_pairs_mut()
                        .extend_pairs(params.query_pairs(tile));
                    url.to_string()
                }
                Err(_) => base_url.clone(),
            },
        }
    }
}

fn vworld_wmts(credential: &Credential, layer: &str, ext: &str) -> TileSource {
    TileSource::Xyz {
        template: format!(
            "{}/{}/{}/{{z}}/{{y}}/{{x}}.{}",
            VWORLD_WMTS_BASE,
            credential.expose(),
            layer,
            ext
        ),
        subdomains: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: TileCoord = TileCoord {
        z: 17,
        x: 111_812,
        y: 50_782,
    };

    #[test]
    fn osm_url_uses_subdomain() {
        let src = TileSource::for_id(SourceId::OpenMap, &Credential::none(), "localhost");
        let url = src.tile_url(TILE);
        // (111812 + 50782) % 3 == 0 -> "a"
        assert_eq!(url, "https://a.tile.openstreetmap.org/17/111812/50782.png");
    }

    #[test]
    fn vworld_urls_are_z_y_x() {
        let key = Credential::new("KEY");
        let base = TileSource::for_id(SourceId::ProviderMap, &key, "localhost");
        assert_eq!(
            base.tile_url(TILE),
            "https://api.vworld.kr/req/wmts/1.0.0/KEY/Base/17/50782/111812.png"
        );
        let sat = TileSource::for_id(SourceId::ProviderSatellite, &key, "localhost");
        assert!(sat.tile_url(TILE).ends_with("/Satellite/17/50782/111812.jpeg"));
        let hybrid = TileSource::for_id(SourceId::ProviderLabels, &key, "localhost");
        assert!(hybrid.tile_url(TILE).contains("/Hybrid/"));
    }

    #[test]
    fn cadastral_getmap_params() {
        let key = Credential::new("KEY");
        let src = TileSource::for_id(SourceId::ProviderCadastral, &key, "example.org");
        let url = src.tile_url(TILE);
        assert!(url.starts_with("https://api.vworld.kr/req/wms?SERVICE=WMS&REQUEST=GetMap"));
        assert!(url.contains("LAYERS=lp_pa_cbnd_bubun%2Clp_pa_cbnd_bonbun"));
        assert!(url.contains("VERSION=1.3.0"));
        assert!(url.contains("CRS=EPSG%3A3857"));
        assert!(url.contains("TRANSPARENT=TRUE"));
        assert!(url.contains("KEY=KEY"));
        assert!(url.contains("DOMAIN=example.org"));
        assert!(url.contains("BBOX="));
    }

    #[test]
    #[should_panic(expected = "without a credential")]
    fn provider_source_without_key_panics() {
        let _ = TileSource::for_id(SourceId::ProviderSatellite, &Credential::none(), "localhost");
    }

    #[test]
    fn debug_hides_key() {
        let params = WmsParams::cadastral(&Credential::new("TOPSECRET"), "localhost");
        assert!(!format!("{params:?}").contains("TOPSECRET"));
    }
}
