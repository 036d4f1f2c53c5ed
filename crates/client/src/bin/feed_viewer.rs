//! Minimal feed viewer: keeps a live media session alive and logs the
//! streams it receives. A real deployment replaces [`LogSink`] with a
//! rendering surface.

use anyhow::Result;
use clap::Parser;
use feedlink::media::{MediaStream, RenderSink, WebRtcMediaFactory};
use feedlink::signaling::WebSocketConnector;
use feedlink::{ClientConfig, ConnectionSupervisor};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "feed-viewer", version, about = "Watch a live media feed, reconnecting as needed")]
struct Args {
    /// Path to a JSON configuration file; takes precedence over the
    /// individual flags below
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Signaling server WebSocket URL
    #[arg(long, env = "FEEDLINK_SIGNALING_URL", default_value = "ws://127.0.0.1:8081/signal")]
    signaling_url: String,

    /// Minimum reconnect delay in milliseconds
    #[arg(long, default_value_t = 50)]
    min_backoff_ms: u64,

    /// Maximum reconnect delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    max_backoff_ms: u64,

    /// STUN server URL (repeatable)
    #[arg(long = "stun-server")]
    stun_servers: Vec<String>,
}

struct LogSink;

impl RenderSink for LogSink {
    fn attach(&self, stream: Arc<dyn MediaStream>) {
        info!(id = %stream.id(), "video stream attached");
    }

    fn detach(&self) {
        info!("video stream detached");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match args.config {
        Some(path) => ClientConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ClientConfig {
            signaling_url: args.signaling_url,
            min_backoff_ms: args.min_backoff_ms,
            max_backoff_ms: args.max_backoff_ms,
            stun_servers: args.stun_servers,
        },
    };

    info!(version = feedlink::version(), url = %config.signaling_url, "feed-viewer starting");

    let stun_servers = config.stun_servers.clone();
    let (supervisor, handle) = ConnectionSupervisor::new(
        config,
        Arc::new(WebSocketConnector::new()),
        Arc::new(WebRtcMediaFactory::new(stun_servers)),
        Arc::new(LogSink),
    )?;

    let runner = tokio::spawn(supervisor.run());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.stop();
    runner.await?;

    Ok(())
}
