//! Error types for the feedlink client.

use thiserror::Error;

/// Errors produced by constructors, configuration validation and the
/// bundled transport implementations.
///
/// The connection supervisor never returns these from its run loop: every
/// runtime failure inside an attempt is absorbed and answered with a
/// reconnect.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Media session error
    #[error("Media session error: {0}")]
    Media(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebRTC error
    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
