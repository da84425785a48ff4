use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Local;
use log::info;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::telemetry::Schema;

/// Short ride near UMass Boston: (latitude, longitude, velocity, battery)
pub const SAMPLE_TRACK: [(f64, f64, f64, f64); 24] = [
    (42.3142, -71.0420, 10.0, 100.0),
    (42.31427, -71.04193, 10.2, 99.8),
    (42.31433, -71.04187, 10.5, 99.6),
    (42.3144, -71.0418, 9.8, 99.4),
    (42.31447, -71.04173, 11.0, 99.2),
    (42.31453, -71.04163, 10.7, 98.9),
    (42.3146, -71.04153, 10.0, 98.5),
    (42.31467, -71.04143, 9.9, 98.1),
    (42.31473, -71.04133, 10.3, 97.8),
    (42.3148, -71.04123, 10.1, 97.5),
    (42.31487, -71.04113, 10.0, 97.2),
    (42.31493, -71.04103, 9.7, 96.9),
    (42.315, -71.04093, 9.8, 96.7),
    (42.31507, -71.04083, 10.2, 96.4),
    (42.31513, -71.04073, 10.4, 96.0),
    (42.3152, -71.04063, 10.6, 95.6),
    (42.31527, -71.04053, 10.1, 95.3),
    (42.31533, -71.04043, 9.9, 95.0),
    (42.3154, -71.04033, 9.6, 94.8),
    (42.31547, -71.04023, 9.8, 94.5),
    (42.31553, -71.04013, 10.0, 94.2),
    (42.3156, -71.04003, 10.3, 93.9),
    (42.31567, -71.03993, 10.5, 93.6),
    (42.31573, -71.03983, 10.2, 93.3),
];

/// Replays `SAMPLE_TRACK` one point per request, wrapping around
#[derive(Clone)]
pub struct MockTelemetry {
    schema: Schema,
    index: Arc<AtomicUsize>,
}

impl MockTelemetry {
    pub fn new(schema: Schema) -> Self {
        MockTelemetry {
            schema,
            index: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Payload for the next point in the active schema
    pub fn next_payload(&self) -> Value {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        let (latitude, longitude, velocity, battery) = SAMPLE_TRACK[i % SAMPLE_TRACK.len()];

        match self.schema {
            Schema::Bike => json!({
                "latitude": latitude,
                "longitude": longitude,
                "velocity": velocity,
                "battery": battery,
                "connection_status": "connected",
            }),
            Schema::Gps => json!({
                "latitude": latitude,
                "longitude": longitude,
                "velocity": velocity,
                "satellites": 7 + (i % 4) as u32,
                "timestamp": Local::now().format("%H:%M:%S").to_string(),
            }),
        }
    }
}

pub fn router(mock: MockTelemetry) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(sample_handler))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(mock)
}

pub async fn start_mock_server(listener: TcpListener, mock: MockTelemetry) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Serving {} telemetry on http://{}", mock.schema, addr);
    }
    axum::serve(listener, router(mock)).await
}

async fn sample_handler(State(mock): State<MockTelemetry>) -> Json<Value> {
    Json(mock.next_payload())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_replays_track_in_order() {
        let app = router(MockTelemetry::new(Schema::Bike));

        let (status, first) = get_json(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["latitude"], json!(42.3142));
        assert_eq!(first["battery"], json!(100.0));
        assert_eq!(first["connection_status"], json!("connected"));

        let (_, second) = get_json(&app, "/").await;
        assert_eq!(second["latitude"], json!(42.31427));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let app = router(MockTelemetry::new(Schema::Bike));

        let (status, body) = get_json(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "not found" }));
    }

    #[test]
    fn test_track_wraps_around() {
        let mock = MockTelemetry::new(Schema::Bike);
        for _ in 0..SAMPLE_TRACK.len() {
            mock.next_payload();
        }
        assert_eq!(mock.next_payload()["latitude"], json!(42.3142));
    }

    #[test]
    fn test_gps_payload_decodes_with_gps_schema() {
        let mock = MockTelemetry::new(Schema::Gps);
        let body = serde_json::to_vec(&mock.next_payload()).unwrap();
        let sample = Schema::Gps.decode(&body).unwrap();

        assert!(sample.position().is_some());
        assert_eq!(sample.satellites, Some(7));
        assert_eq!(sample.timestamp.map(|t| t.len()), Some(8));
        assert_eq!(sample.battery, None);
    }
}
