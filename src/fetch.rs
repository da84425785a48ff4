use log::warn;
use std::future::Future;

use crate::config::PollerConfig;
use crate::error::FetchError;
use crate::telemetry::{Schema, TelemetrySample};

/// Where samples come from
pub trait TelemetrySource {
    fn fetch(&self) -> impl Future<Output = Result<TelemetrySample, FetchError>> + Send;
}

/// Plain `GET` against the deployment endpoint
pub struct HttpTelemetrySource {
    client: reqwest::Client,
    url: String,
    schema: Schema,
}

impl HttpTelemetrySource {
    pub fn new(config: &PollerConfig) -> Self {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "telemetry_map/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().unwrap_or_else(|e| {
            warn!("HTTP client setup failed ({}), using defaults", e);
            reqwest::Client::new()
        });

        HttpTelemetrySource {
            client,
            url: config.endpoint.clone(),
            schema: config.schema,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TelemetrySource for HttpTelemetrySource {
    async fn fetch(&self) -> Result<TelemetrySample, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        self.schema.decode(&body)
    }
}
