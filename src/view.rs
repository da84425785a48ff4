use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::telemetry::{FieldId, LatLon};

/// Map widget holding the viewport and the position marker
pub trait MapView {
    fn set_view(&mut self, center: LatLon, zoom: u8);
    /// Recenter without touching the zoom level
    fn set_center(&mut self, center: LatLon);
    fn add_marker(&mut self, position: LatLon, style: &MarkerStyle);
    fn set_marker_position(&mut self, position: LatLon);
    fn marker_position(&self) -> Option<LatLon>;
    fn enable_drag(&mut self);
    fn disable_drag(&mut self);
    fn add_tile_layer(&mut self, url_template: &str);
    fn add_scale_control(&mut self, control: &ScaleControl);

    /// Hold back the following changes until `end_update`, for maps that
    /// publish state to a remote viewer
    fn begin_update(&mut self) {}
    fn end_update(&mut self) {}
}

/// Labelled text fields next to the map
pub trait StatusPanel {
    fn set_field_text(&mut self, field: FieldId, text: &str);

    /// Caption of the centering button, for panels that draw one
    fn set_toggle_label(&mut self, _label: &str) {}

    /// See `MapView::begin_update`
    fn begin_update(&mut self) {}
    fn end_update(&mut self) {}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: u32,
    pub color: String,
    pub weight: u32,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        // blue dot with a white ring
        MarkerStyle {
            radius: 8,
            color: "white".to_string(),
            weight: 3,
            fill_color: "#007AFF".to_string(),
            fill_opacity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScaleControl {
    pub position: ControlPosition,
    pub metric: bool,
    pub imperial: bool,
    pub max_width: u32,
}

impl Default for ScaleControl {
    fn default() -> Self {
        ScaleControl {
            position: ControlPosition::BottomRight,
            metric: false,
            imperial: true,
            max_width: 200,
        }
    }
}

/// Whether the viewport follows the marker.
///
/// `Locked`: every position-valid poll recenters, dragging is off.
/// `Unlocked`: the marker moves, the viewport stays, dragging is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CenteringLock {
    #[default]
    Locked,
    Unlocked,
}

impl CenteringLock {
    pub fn toggled(self) -> Self {
        match self {
            CenteringLock::Locked => CenteringLock::Unlocked,
            CenteringLock::Unlocked => CenteringLock::Locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        *self == CenteringLock::Locked
    }

    /// Caption of the button, which names the action it performs
    pub fn button_label(&self) -> &'static str {
        match self {
            CenteringLock::Locked => "Unlock to move",
            CenteringLock::Unlocked => "Lock centering",
        }
    }
}

impl Display for CenteringLock {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CenteringLock::Locked => write!(f, "LOCKED"),
            CenteringLock::Unlocked => write!(f, "UNLOCKED"),
        }
    }
}

/// Session view state. Marker position and viewport live in the `MapView`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub centering: CenteringLock,
}

impl ViewState {
    pub fn centering_enabled(&self) -> bool {
        self.centering.is_locked()
    }
}
