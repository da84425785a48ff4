use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tower_http::trace::TraceLayer;

use crate::poller::Control;
use crate::telemetry::{FieldId, LatLon};
use crate::view::{MapView, MarkerStyle, ScaleControl, StatusPanel};

/// Text frame the page sends when the centering button is clicked
pub const TOGGLE_MESSAGE: &str = "toggle_centering";

const PUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the browser needs to draw the current display
#[derive(Clone, Debug, Default, Serialize)]
pub struct DisplaySnapshot {
    /// Bumped once per published change so clients only get new frames
    pub revision: u64,
    /// Bumped on every `set_view`/`set_center`, even to the same
    /// coordinates. The page recenters whenever it moves.
    pub view_revision: u64,
    pub center: Option<LatLon>,
    pub zoom: Option<u8>,
    pub marker: Option<LatLon>,
    pub marker_style: Option<MarkerStyle>,
    pub drag_enabled: bool,
    pub tile_layers: Vec<String>,
    pub scale_control: Option<ScaleControl>,
    pub toggle_label: String,
    /// Keyed by element id
    pub fields: BTreeMap<String, String>,
    /// Open `begin_update` calls. Frames are held back while nonzero.
    #[serde(skip)]
    open_updates: u32,
    #[serde(skip)]
    dirty: bool,
}

impl DisplaySnapshot {
    fn publish(&mut self) {
        if self.open_updates == 0 {
            self.revision += 1;
        } else {
            self.dirty = true;
        }
    }

    fn begin_update(&mut self) {
        self.open_updates += 1;
    }

    fn end_update(&mut self) {
        self.open_updates = self.open_updates.saturating_sub(1);
        if self.open_updates == 0 && self.dirty {
            self.dirty = false;
            self.revision += 1;
        }
    }

    fn is_updating(&self) -> bool {
        self.open_updates > 0
    }
}

pub type SharedSnapshot = Arc<Mutex<DisplaySnapshot>>;

fn update(snapshot: &SharedSnapshot, change: impl FnOnce(&mut DisplaySnapshot)) {
    if let Ok(mut snap) = snapshot.lock() {
        change(&mut *snap);
        snap.publish();
    }
}

fn begin_update(snapshot: &SharedSnapshot) {
    if let Ok(mut snap) = snapshot.lock() {
        snap.begin_update();
    }
}

fn end_update(snapshot: &SharedSnapshot) {
    if let Ok(mut snap) = snapshot.lock() {
        snap.end_update();
    }
}

/// `MapView` backed by the shared snapshot
pub struct WebMap {
    snapshot: SharedSnapshot,
}

impl WebMap {
    pub fn new(snapshot: SharedSnapshot) -> Self {
        WebMap { snapshot }
    }
}

impl MapView for WebMap {
    fn set_view(&mut self, center: LatLon, zoom: u8) {
        update(&self.snapshot, |s| {
            s.center = Some(center);
            s.zoom = Some(zoom);
            s.view_revision += 1;
        });
    }

    fn set_center(&mut self, center: LatLon) {
        update(&self.snapshot, |s| {
            s.center = Some(center);
            s.view_revision += 1;
        });
    }

    fn add_marker(&mut self, position: LatLon, style: &MarkerStyle) {
        update(&self.snapshot, |s| {
            s.marker = Some(position);
            s.marker_style = Some(style.clone());
        });
    }

    fn set_marker_position(&mut self, position: LatLon) {
        update(&self.snapshot, |s| s.marker = Some(position));
    }

    fn marker_position(&self) -> Option<LatLon> {
        self.snapshot.lock().ok().and_then(|s| s.marker)
    }

    fn enable_drag(&mut self) {
        update(&self.snapshot, |s| s.drag_enabled = true);
    }

    fn disable_drag(&mut self) {
        update(&self.snapshot, |s| s.drag_enabled = false);
    }

    fn add_tile_layer(&mut self, url_template: &str) {
        update(&self.snapshot, |s| s.tile_layers.push(url_template.to_string()));
    }

    fn add_scale_control(&mut self, control: &ScaleControl) {
        update(&self.snapshot, |s| s.scale_control = Some(control.clone()));
    }

    fn begin_update(&mut self) {
        begin_update(&self.snapshot);
    }

    fn end_update(&mut self) {
        end_update(&self.snapshot);
    }
}

/// `StatusPanel` backed by the shared snapshot
pub struct WebPanel {
    snapshot: SharedSnapshot,
}

impl WebPanel {
    pub fn new(snapshot: SharedSnapshot) -> Self {
        WebPanel { snapshot }
    }
}

impl StatusPanel for WebPanel {
    fn set_field_text(&mut self, field: FieldId, text: &str) {
        update(&self.snapshot, |s| {
            s.fields
                .insert(field.element_id().to_string(), text.to_string());
        });
    }

    fn set_toggle_label(&mut self, label: &str) {
        update(&self.snapshot, |s| s.toggle_label = label.to_string());
    }

    fn begin_update(&mut self) {
        begin_update(&self.snapshot);
    }

    fn end_update(&mut self) {
        end_update(&self.snapshot);
    }
}

#[derive(Clone)]
pub struct DashboardState {
    snapshot: SharedSnapshot,
    controls: Sender<Control>,
}

impl DashboardState {
    pub fn new(snapshot: SharedSnapshot, controls: Sender<Control>) -> Self {
        DashboardState { snapshot, controls }
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_dashboard(listener: TcpListener, state: DashboardState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Dashboard at http://{}", addr);
    }
    axum::serve(listener, router(state)).await
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("dashboard_static.html"))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Map a frame from the page to a control request
pub fn parse_control(text: &str) -> Option<Control> {
    (text.trim() == TOGGLE_MESSAGE).then_some(Control::ToggleCentering)
}

/// Serialized snapshot if it changed since `last_revision` and no update is
/// half done
fn snapshot_frame(snapshot: &SharedSnapshot, last_revision: &mut Option<u64>) -> Option<String> {
    let snap = snapshot.lock().ok()?;
    if snap.is_updating() || *last_revision == Some(snap.revision) {
        return None;
    }
    *last_revision = Some(snap.revision);

    match serde_json::to_string(&*snap) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Could not serialize display snapshot: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: DashboardState) {
    let (mut sender, mut receiver) = socket.split();

    let controls = state.controls.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match parse_control(&text) {
                    Some(control) => {
                        if controls.send(control).await.is_err() {
                            break;
                        }
                    }
                    None => debug!("Ignoring dashboard message {:?}", text),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let snapshot = state.snapshot.clone();
    let mut send_task = tokio::spawn(async move {
        let mut last_revision = None;
        loop {
            if let Some(json) = snapshot_frame(&snapshot, &mut last_revision) {
                if sender.send(Message::Text(json)).await.is_err() {
                    // client disconnected
                    break;
                }
            }
            sleep(PUSH_INTERVAL).await;
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}
