// Live GPS telemetry map
// Polls a telemetry endpoint and drives a map marker plus a status panel

pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod fetch;
pub mod mock_server;
pub mod poller;
pub mod telemetry;
pub mod view;

pub use config::{Deployment, PollerConfig, TileStyle};
pub use display::MapDisplay;
pub use error::FetchError;
pub use fetch::{HttpTelemetrySource, TelemetrySource};
pub use poller::{Control, PollStats, TelemetryPoller};
pub use telemetry::{FieldId, LatLon, Schema, TelemetrySample};
pub use view::{CenteringLock, MapView, StatusPanel, ViewState};
