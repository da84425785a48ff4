use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use telemetry_map_rs::config::{Deployment, PollerConfig, TileStyle, DEFAULT_INTERVAL_MS, DEFAULT_ZOOM};
use telemetry_map_rs::dashboard::{self, DashboardState, SharedSnapshot, WebMap, WebPanel};
use telemetry_map_rs::{Control, HttpTelemetrySource, LatLon, TelemetryPoller};

#[derive(Parser, Debug)]
#[command(name = "telemetry_map")]
#[command(about = "Live GPS telemetry map served to the browser", long_about = None)]
struct Args {
    /// Deployment profile (sets endpoint and telemetry schema)
    #[arg(long, value_enum, default_value_t = Deployment::Local)]
    profile: Deployment,

    /// Override the profile's telemetry endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    interval_ms: u64,

    /// Initial zoom level
    #[arg(long, default_value_t = DEFAULT_ZOOM)]
    zoom: u8,

    /// Map tile provider
    #[arg(long, value_enum, default_value_t = TileStyle::EsriWorldImagery)]
    tile_style: TileStyle,

    /// Fallback latitude when the first fetch has no fix
    #[arg(long, allow_hyphen_values = true)]
    fallback_lat: Option<f64>,

    /// Fallback longitude when the first fetch has no fix
    #[arg(long, allow_hyphen_values = true)]
    fallback_lon: Option<f64>,

    /// HTTP request timeout in milliseconds (none by default)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Dashboard port
    #[arg(long, default_value = "8081")]
    port: u16,
}

impl Args {
    fn poller_config(&self) -> PollerConfig {
        let mut config = PollerConfig::for_deployment(self.profile);
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        config.interval_ms = self.interval_ms;
        config.initial_zoom = self.zoom;
        config.tile_style = self.tile_style;
        config.fallback = LatLon::new(
            self.fallback_lat.unwrap_or(config.fallback.lat),
            self.fallback_lon.unwrap_or(config.fallback.lon),
        );
        config.request_timeout_ms = self.timeout_ms;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.poller_config();

    info!("Telemetry map starting ({:?} profile)", args.profile);
    info!("  {}", config);

    let (controls_tx, mut controls_rx) = mpsc::channel(16);
    let snapshot = SharedSnapshot::default();

    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("binding dashboard port {}", args.port))?;
    let state = DashboardState::new(snapshot.clone(), controls_tx.clone());
    tokio::spawn(async move {
        if let Err(e) = dashboard::start_dashboard(listener, state).await {
            error!("Dashboard stopped: {}", e);
        }
    });

    // Ctrl-C replaces the default SIGINT exit, so every wait below must
    // also watch the control channel
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            if controls_tx.send(Control::Shutdown).await.is_err() {
                warn!("Poller already gone");
            }
        }
    });

    let source = HttpTelemetrySource::new(&config);
    let mut poller = TelemetryPoller::new(source, config);
    let Some(mut display) = poller
        .bootstrap_or_shutdown(
            WebMap::new(snapshot.clone()),
            WebPanel::new(snapshot),
            &mut controls_rx,
        )
        .await
    else {
        info!("Done: {}", poller.stats());
        return Ok(());
    };

    let stats = poller.run(&mut display, controls_rx).await;
    info!("Done: {}", stats);

    Ok(())
}
