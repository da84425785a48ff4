use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use telemetry_map_rs::mock_server::{start_mock_server, MockTelemetry};
use telemetry_map_rs::Schema;

#[derive(Parser, Debug)]
#[command(name = "mock_telemetry")]
#[command(about = "Replays a recorded ride as a telemetry endpoint", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to serve on
    #[arg(long, default_value = "5001")]
    port: u16,

    /// Payload layout to serve
    #[arg(long, value_enum, default_value_t = Schema::Bike)]
    schema: Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("binding {}:{}", args.host, args.port))?;

    start_mock_server(listener, MockTelemetry::new(args.schema))
        .await
        .context("mock telemetry server")?;

    Ok(())
}
