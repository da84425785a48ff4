use log::{debug, info};

use crate::config::PollerConfig;
use crate::telemetry::{FieldId, LatLon, Schema, TelemetrySample};
use crate::view::{CenteringLock, MapView, MarkerStyle, ScaleControl, StatusPanel, ViewState};

/// Rendering used for a field no sample has provided yet
pub const UNKNOWN: &str = "unknown";

/// Format a status label, e.g. `Velocity: 5 mph`
pub fn format_label(schema: Schema, field: FieldId, value: &str) -> String {
    format!("{}: {}{}", field.label(), value, schema.unit(field))
}

pub fn unknown_label(field: FieldId) -> String {
    format!("{}: {}", field.label(), UNKNOWN)
}

/// Owns the map, the status panel and the view state, and is the only thing
/// that mutates them.
pub struct MapDisplay<M, P> {
    map: M,
    panel: P,
    view: ViewState,
    schema: Schema,
}

impl<M: MapView, P: StatusPanel> MapDisplay<M, P> {
    /// Set up the map around the bootstrap sample, or around the configured
    /// fallback when there is no position-valid one.
    pub fn initialize(
        mut map: M,
        mut panel: P,
        config: &PollerConfig,
        bootstrap: Option<&TelemetrySample>,
    ) -> Self {
        let center = match bootstrap.and_then(TelemetrySample::position) {
            Some(position) => position,
            None => {
                info!("No initial fix, centering on fallback {}", config.fallback);
                config.fallback
            }
        };

        let view = ViewState::default();
        map.begin_update();
        panel.begin_update();
        map.set_view(center, config.initial_zoom);
        map.add_tile_layer(config.tile_style.url_template());
        map.add_scale_control(&ScaleControl::default());
        map.add_marker(center, &MarkerStyle::default());
        map.disable_drag();

        for &field in config.schema.fields() {
            panel.set_field_text(field, &unknown_label(field));
        }
        panel.set_toggle_label(view.centering.button_label());

        let mut display = MapDisplay {
            map,
            panel,
            view,
            schema: config.schema,
        };
        if let Some(sample) = bootstrap {
            display.apply(sample);
        }
        display.end_update();
        display
    }

    fn begin_update(&mut self) {
        self.map.begin_update();
        self.panel.begin_update();
    }

    fn end_update(&mut self) {
        self.map.end_update();
        self.panel.end_update();
    }

    /// Render one sample. Returns the new marker position when the sample
    /// was position-valid.
    ///
    /// Coordinates only move the marker when position-valid; every other
    /// field of the schema is rendered if present and left alone if absent.
    pub fn apply(&mut self, sample: &TelemetrySample) -> Option<LatLon> {
        let position = sample.position();
        self.begin_update();

        match position {
            Some(pos) => {
                self.map.set_marker_position(pos);
                if self.view.centering_enabled() {
                    self.map.set_center(pos);
                }
            }
            None => debug!("Sample has no usable fix, marker stays"),
        }

        for &field in self.schema.fields() {
            if field.is_coordinate() && position.is_none() {
                continue;
            }
            if let Some(value) = sample.field_value(field) {
                self.panel
                    .set_field_text(field, &format_label(self.schema, field, &value));
            }
        }

        self.end_update();
        position
    }

    /// Flip the centering lock. Locking recenters on the current marker
    /// position before returning.
    pub fn toggle_centering(&mut self) -> CenteringLock {
        self.view.centering = self.view.centering.toggled();
        self.begin_update();

        if self.view.centering.is_locked() {
            if let Some(pos) = self.map.marker_position() {
                self.map.set_center(pos);
            }
            self.map.disable_drag();
        } else {
            self.map.enable_drag();
        }
        self.panel
            .set_toggle_label(self.view.centering.button_label());
        self.end_update();

        self.view.centering
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::fakes::{RecordingMap, RecordingPanel};

    fn gps_config() -> PollerConfig {
        PollerConfig {
            schema: Schema::Gps,
            ..Default::default()
        }
    }

    fn fix(lat: f64, lon: f64) -> TelemetrySample {
        TelemetrySample {
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    fn display(config: &PollerConfig) -> MapDisplay<RecordingMap, RecordingPanel> {
        MapDisplay::initialize(
            RecordingMap::default(),
            RecordingPanel::default(),
            config,
            None,
        )
    }

    #[test]
    fn test_initialize_without_sample_uses_fallback() {
        let config = gps_config();
        let display = display(&config);
        let map = display.map();

        assert_eq!(map.center, Some(config.fallback));
        assert_eq!(map.zoom, Some(20));
        assert_eq!(map.marker, Some(config.fallback));
        assert_eq!(map.marker_style, Some(MarkerStyle::default()));
        assert_eq!(map.tile_layers, vec![config.tile_style.url_template().to_string()]);
        assert_eq!(map.scale, Some(ScaleControl::default()));
        assert!(!map.drag_enabled);

        let panel = display.panel();
        assert_eq!(panel.text(FieldId::Velocity), Some("Velocity: unknown"));
        assert_eq!(panel.text(FieldId::Timestamp), Some("Timestamp: unknown"));
        assert_eq!(panel.text(FieldId::Battery), None);
        assert_eq!(panel.toggle_label.as_deref(), Some("Unlock to move"));
    }

    #[test]
    fn test_initialize_with_fix_centers_on_it() {
        let config = gps_config();
        let sample = TelemetrySample {
            velocity: Some(3.5),
            ..fix(42.31, -71.04)
        };
        let display = MapDisplay::initialize(
            RecordingMap::default(),
            RecordingPanel::default(),
            &config,
            Some(&sample),
        );

        assert_eq!(display.map().center, Some(LatLon::new(42.31, -71.04)));
        assert_eq!(display.map().marker, Some(LatLon::new(42.31, -71.04)));
        assert_eq!(display.panel().text(FieldId::Velocity), Some("Velocity: 3.5 mph"));
        assert_eq!(display.panel().text(FieldId::Satellites), Some("Satellites: unknown"));
    }

    #[test]
    fn test_initialize_with_no_fix_sample_uses_fallback() {
        let config = gps_config();
        let display = MapDisplay::initialize(
            RecordingMap::default(),
            RecordingPanel::default(),
            &config,
            Some(&fix(0.0, 0.0)),
        );

        assert_eq!(display.map().center, Some(config.fallback));
        assert_eq!(display.map().marker, Some(config.fallback));
    }

    #[test]
    fn test_null_island_rejected_regardless_of_other_fields() {
        let mut display = display(&gps_config());
        display.apply(&fix(42.31, -71.04));

        let sample = TelemetrySample {
            velocity: Some(0.0),
            satellites: Some(12),
            timestamp: Some("12:00:01".to_string()),
            ..fix(0.0, 0.0)
        };
        assert_eq!(display.apply(&sample), None);

        assert_eq!(display.map().marker, Some(LatLon::new(42.31, -71.04)));
        assert_eq!(display.map().center, Some(LatLon::new(42.31, -71.04)));
        assert_eq!(display.panel().text(FieldId::Latitude), Some("Latitude: 42.31°"));
        // scalars still go through
        assert_eq!(display.panel().text(FieldId::Velocity), Some("Velocity: 0 mph"));
        assert_eq!(display.panel().text(FieldId::Satellites), Some("Satellites: 12"));
    }

    #[test]
    fn test_missing_coordinates_leave_marker() {
        let mut display = display(&gps_config());
        display.apply(&fix(42.31, -71.04));

        let partial = TelemetrySample {
            latitude: Some(43.0),
            velocity: Some(7.0),
            ..Default::default()
        };
        display.apply(&partial);

        assert_eq!(display.map().marker, Some(LatLon::new(42.31, -71.04)));
        assert_eq!(display.panel().text(FieldId::Latitude), Some("Latitude: 42.31°"));
        assert_eq!(display.panel().text(FieldId::Velocity), Some("Velocity: 7 mph"));
    }

    #[test]
    fn test_absent_fields_keep_previous_label() {
        let mut display = display(&gps_config());
        display.apply(&TelemetrySample {
            satellites: Some(8),
            ..fix(42.31, -71.04)
        });
        display.apply(&fix(42.32, -71.05));

        assert_eq!(display.panel().text(FieldId::Satellites), Some("Satellites: 8"));
        assert_eq!(display.panel().text(FieldId::Velocity), Some("Velocity: unknown"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut display = display(&gps_config());
        let sample = TelemetrySample {
            velocity: Some(5.0),
            satellites: Some(8),
            timestamp: Some("12:00:00".to_string()),
            ..fix(42.31, -71.04)
        };

        display.apply(&sample);
        let map_once = display.map().center;
        let marker_once = display.map().marker;
        let fields_once = display.panel().fields.clone();

        display.apply(&sample);
        assert_eq!(display.map().center, map_once);
        assert_eq!(display.map().marker, marker_once);
        assert_eq!(display.panel().fields, fields_once);
    }

    #[test]
    fn test_unlocked_moves_marker_but_not_viewport() {
        let config = gps_config();
        let mut display = display(&config);
        assert_eq!(display.toggle_centering(), CenteringLock::Unlocked);
        assert!(display.map().drag_enabled);

        let mut last = None;
        for i in 1..=5 {
            last = display.apply(&fix(42.31 + i as f64 * 0.001, -71.04));
            assert_eq!(display.map().center, Some(config.fallback));
        }
        assert!(last.is_some());
        assert_eq!(display.map().marker, last);
    }

    #[test]
    fn test_locking_recenters_on_current_marker() {
        let mut display = display(&gps_config());
        display.toggle_centering();
        display.apply(&fix(42.35, -71.06));
        let before = display.map().recenters;

        assert_eq!(display.toggle_centering(), CenteringLock::Locked);
        assert_eq!(display.map().center, Some(LatLon::new(42.35, -71.06)));
        assert_eq!(display.map().recenters, before + 1);
        assert!(!display.map().drag_enabled);
        assert_eq!(display.panel().toggle_label.as_deref(), Some("Unlock to move"));
        assert!(display.view().centering_enabled());
    }

    #[test]
    fn test_bike_labels_have_no_units() {
        let config = PollerConfig::default();
        let mut display = display(&config);
        display.apply(&TelemetrySample {
            velocity: Some(10.2),
            battery: Some(99.8),
            connection_status: Some("connected".to_string()),
            ..fix(42.31427, -71.04193)
        });

        let panel = display.panel();
        assert_eq!(panel.text(FieldId::Latitude), Some("Latitude: 42.31427"));
        assert_eq!(panel.text(FieldId::Velocity), Some("Velocity: 10.2"));
        assert_eq!(panel.text(FieldId::Battery), Some("Battery: 99.8"));
        assert_eq!(
            panel.text(FieldId::ConnectionStatus),
            Some("Connection Status: connected")
        );
    }
}
