//! Self-healing live media feed client.
//!
//! Feedlink keeps a WebRTC media session to a streaming server alive
//! indefinitely. A WebSocket signaling exchange bootstraps each session,
//! and a connection supervisor tears the session down and re-dials with
//! exponential backoff whenever the signaling link or the media transport
//! degrades. The caller supplies a rendering surface and gets the first
//! inbound video stream of every successful attempt.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ ConnectionSupervisor (one attempt at a time)            │
//! │  ├── SignalingChannel    JSON descriptors over WS       │
//! │  ├── MediaSession        WebRTC offer/answer + tracks   │
//! │  ├── Backoff             min..max, doubles on failure   │
//! │  └── RenderSink          externally supplied surface    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use feedlink::media::{MediaStream, RenderSink, WebRtcMediaFactory};
//! use feedlink::signaling::WebSocketConnector;
//! use feedlink::{ClientConfig, ConnectionSupervisor};
//!
//! struct LogSink;
//!
//! impl RenderSink for LogSink {
//!     fn attach(&self, stream: Arc<dyn MediaStream>) {
//!         println!("video stream attached: {}", stream.id());
//!     }
//!     fn detach(&self) {}
//! }
//!
//! # fn main() -> feedlink::Result<()> {
//! let config = ClientConfig::default();
//! let stun_servers = config.stun_servers.clone();
//! let (supervisor, handle) = ConnectionSupervisor::new(
//!     config,
//!     Arc::new(WebSocketConnector::new()),
//!     Arc::new(WebRtcMediaFactory::new(stun_servers)),
//!     Arc::new(LogSink),
//! )?;
//! // tokio::spawn(supervisor.run());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backoff;
pub mod config;
pub mod error;
mod events;
pub mod media;
pub mod signaling;
mod supervisor;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use events::{AttemptId, MediaEvents, SignalingEvents};
pub use supervisor::{ConnectionSupervisor, SupervisorHandle, SupervisorState};

/// Get the version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
