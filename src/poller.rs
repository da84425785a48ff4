use futures::future::{Fuse, FusedFuture, FutureExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::PollerConfig;
use crate::display::MapDisplay;
use crate::error::FetchError;
use crate::fetch::TelemetrySource;
use crate::telemetry::TelemetrySample;
use crate::view::{MapView, StatusPanel};

/// Requests handled by the poll loop between ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    ToggleCentering,
    Shutdown,
}

/// Poll counters, including the bootstrap fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Ticks dropped because the previous fetch was still running
    pub skipped: u64,
}

impl PollStats {
    /// Count a finished fetch and log failures. Failures never go further.
    fn record(&mut self, result: Result<TelemetrySample, FetchError>) -> Option<TelemetrySample> {
        match result {
            Ok(sample) => {
                self.succeeded += 1;
                Some(sample)
            }
            Err(e) => {
                self.failed += 1;
                warn!("Poll failed, keeping last display: {}", e);
                None
            }
        }
    }
}

/// Count a finished fetch and render it if it succeeded
fn deliver<M: MapView, P: StatusPanel>(
    stats: &mut PollStats,
    display: &mut MapDisplay<M, P>,
    result: Result<TelemetrySample, FetchError>,
) {
    if let Some(sample) = stats.record(result) {
        display.apply(&sample);
    }
}

impl Display for PollStats {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} polls ({} ok, {} failed), {} ticks skipped",
            self.started, self.succeeded, self.failed, self.skipped
        )
    }
}

/// Fetches telemetry on a fixed interval and hands it to a `MapDisplay`
pub struct TelemetryPoller<S> {
    source: S,
    config: PollerConfig,
    stats: PollStats,
}

impl<S: TelemetrySource> TelemetryPoller<S> {
    pub fn new(source: S, config: PollerConfig) -> Self {
        TelemetryPoller {
            source,
            config,
            stats: PollStats::default(),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    async fn fetch(&mut self) -> Option<TelemetrySample> {
        self.stats.started += 1;
        let result = self.source.fetch().await;
        self.stats.record(result)
    }

    /// Fetch once and build the display around the result
    pub async fn bootstrap<M: MapView, P: StatusPanel>(&mut self, map: M, panel: P) -> MapDisplay<M, P> {
        let initial = self.fetch().await;
        MapDisplay::initialize(map, panel, &self.config, initial.as_ref())
    }

    /// `bootstrap`, abandoned with `None` when `Control::Shutdown` arrives or
    /// every control sender is gone first. Toggles are dropped since there is
    /// no map to center yet.
    pub async fn bootstrap_or_shutdown<M: MapView, P: StatusPanel>(
        &mut self,
        map: M,
        panel: P,
        controls: &mut Receiver<Control>,
    ) -> Option<MapDisplay<M, P>> {
        let startup = self.bootstrap(map, panel);
        tokio::pin!(startup);

        loop {
            tokio::select! {
                display = &mut startup => return Some(display),
                control = controls.recv() => match control {
                    Some(Control::ToggleCentering) => debug!("Map not ready, ignoring centering toggle"),
                    Some(Control::Shutdown) | None => {
                        info!("Shutdown before the first fetch finished");
                        return None;
                    }
                },
            }
        }
    }

    /// One poll cycle. A failed fetch leaves the display as it was.
    pub async fn poll<M: MapView, P: StatusPanel>(&mut self, display: &mut MapDisplay<M, P>) {
        self.stats.started += 1;
        let result = self.source.fetch().await;
        deliver(&mut self.stats, display, result);
    }

    /// Poll every `interval` until `Control::Shutdown` arrives or every
    /// control sender is gone.
    ///
    /// At most one fetch is in flight. A tick that fires while it is still
    /// running is dropped, so responses are always applied in request order.
    /// Controls are handled while a fetch is pending.
    pub async fn run<M: MapView, P: StatusPanel>(
        self,
        display: &mut MapDisplay<M, P>,
        mut controls: Receiver<Control>,
    ) -> PollStats {
        let TelemetryPoller {
            source,
            config,
            mut stats,
        } = self;

        let mut ticker = interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick is immediate and bootstrap already fetched
        ticker.tick().await;

        info!("Polling {} every {}ms", config.endpoint, config.interval_ms);

        let in_flight = Fuse::terminated();
        tokio::pin!(in_flight);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if in_flight.is_terminated() {
                        stats.started += 1;
                        in_flight.set(source.fetch().fuse());
                    } else {
                        stats.skipped += 1;
                        debug!("Previous poll still in flight, skipping tick");
                    }
                }
                result = &mut in_flight => deliver(&mut stats, display, result),
                control = controls.recv() => match control {
                    Some(Control::ToggleCentering) => {
                        let state = display.toggle_centering();
                        info!("Centering {}", state);
                    }
                    Some(Control::Shutdown) | None => break,
                },
            }
        }

        info!("Poller stopped: {}", stats);
        stats
    }
}
