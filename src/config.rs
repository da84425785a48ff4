use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::telemetry::{LatLon, Schema};

pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_ZOOM: u8 = 20;
/// UMass Boston, used when the first fetch yields no fix
pub const FALLBACK_COORDS: LatLon = LatLon::new(42.3142, -71.042);

const LOCAL_ENDPOINT: &str = "http://localhost:5001";
const ESP32_ENDPOINT: &str = "http://10.0.0.54:5001/";

/// Compiled-in deployments. Each one pins an endpoint and the telemetry
/// schema that endpoint serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Replay server on this machine
    Local,
    /// GPS board on the bike's access point
    Esp32,
}

impl Deployment {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Deployment::Local => LOCAL_ENDPOINT,
            Deployment::Esp32 => ESP32_ENDPOINT,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            Deployment::Local => Schema::Bike,
            Deployment::Esp32 => Schema::Gps,
        }
    }
}

/// Map tile providers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TileStyle {
    #[default]
    EsriWorldImagery,
    EsriWorldStreetmap,
    OsmStandard,
    CartoLight,
    CartoDark,
    StadiaSmooth,
    StadiaSmoothDark,
}

impl TileStyle {
    /// Leaflet URL template
    pub fn url_template(&self) -> &'static str {
        match self {
            TileStyle::EsriWorldImagery => "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            TileStyle::EsriWorldStreetmap => "https://server.arcgisonline.com/ArcGIS/rest/services/World_Street_Map/MapServer/tile/{z}/{y}/{x}",
            TileStyle::OsmStandard => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileStyle::CartoLight => "https://cartodb-basemaps-a.global.ssl.fastly.net/light_all/{z}/{x}/{y}.png",
            TileStyle::CartoDark => "https://cartodb-basemaps-a.global.ssl.fastly.net/dark_all/{z}/{x}/{y}.png",
            TileStyle::StadiaSmooth => "https://tiles.stadiamaps.com/tiles/alidade_smooth/{z}/{x}/{y}{r}.png",
            TileStyle::StadiaSmoothDark => "https://tiles.stadiamaps.com/tiles/alidade_smooth_dark/{z}/{x}/{y}{r}.png",
        }
    }
}

/// Everything the poller needs to know about its deployment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    pub endpoint: String,
    pub schema: Schema,
    pub interval_ms: u64,
    pub initial_zoom: u8,
    pub fallback: LatLon,
    pub tile_style: TileStyle,
    /// `None` keeps the HTTP client's default (no timeout)
    pub request_timeout_ms: Option<u64>,
}

impl PollerConfig {
    pub fn for_deployment(deployment: Deployment) -> Self {
        PollerConfig {
            endpoint: deployment.endpoint().to_string(),
            schema: deployment.schema(),
            interval_ms: DEFAULT_INTERVAL_MS,
            initial_zoom: DEFAULT_ZOOM,
            fallback: FALLBACK_COORDS,
            tile_style: TileStyle::default(),
            request_timeout_ms: None,
        }
    }

    pub fn interval(&self) -> Duration {
        // a zero period would make tokio's interval panic
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::for_deployment(Deployment::Local)
    }
}

impl Display for PollerConfig {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "endpoint={} schema={} interval={}ms zoom={} fallback={}",
            self.endpoint, self.schema, self.interval_ms, self.initial_zoom, self.fallback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();

        assert_eq!(config.endpoint, "http://localhost:5001");
        assert_eq!(config.schema, Schema::Bike);
        assert_eq!(config.interval(), Duration::from_millis(1000));
        assert_eq!(config.initial_zoom, 20);
        assert_eq!(config.fallback, LatLon::new(42.3142, -71.042));
        assert_eq!(config.tile_style, TileStyle::EsriWorldImagery);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_deployments_pin_their_schema() {
        let esp32 = PollerConfig::for_deployment(Deployment::Esp32);
        assert_eq!(esp32.endpoint, "http://10.0.0.54:5001/");
        assert_eq!(esp32.schema, Schema::Gps);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = PollerConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_tile_style_names() {
        let style = TileStyle::from_str("carto-dark", true).unwrap();
        assert_eq!(style, TileStyle::CartoDark);
        assert!(style.url_template().contains("dark_all"));

        for style in TileStyle::value_variants() {
            let url = style.url_template();
            assert!(url.starts_with("https://"));
            assert!(url.contains("{z}") && url.contains("{x}") && url.contains("{y}"));
        }
    }
}
