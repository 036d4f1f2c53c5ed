//! Client configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a connection supervisor and its bundled transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Signaling server WebSocket URL (ws:// or wss://). Every reconnect
    /// attempt dials the same URL.
    pub signaling_url: String,

    /// Lower bound of the reconnect delay, in milliseconds. Also the value
    /// the delay resets to once the media transport is fully connected.
    pub min_backoff_ms: u64,

    /// Upper bound of the reconnect delay, in milliseconds.
    pub max_backoff_ms: u64,

    /// STUN server URLs handed to the bundled WebRTC media session.
    /// Empty works fine on a LAN.
    pub stun_servers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8081/signal".to_string(),
            min_backoff_ms: 50,
            max_backoff_ms: 1_000,
            stun_servers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from its JSON representation and validate it.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON, or a configuration
    /// error if the parsed values fail [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the signaling URL is not a WebSocket URL, the
    /// minimum backoff is zero, or the backoff bounds are inverted.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.signaling_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid signaling_url: {}", e)))?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(Error::InvalidConfig(format!(
                "signaling_url must use ws:// or wss://, got: {}",
                self.signaling_url
            )));
        }

        if self.min_backoff_ms == 0 {
            return Err(Error::InvalidConfig(
                "min_backoff_ms must be greater than zero".to_string(),
            ));
        }

        if self.min_backoff_ms > self.max_backoff_ms {
            return Err(Error::InvalidConfig(format!(
                "min_backoff_ms ({}) must not exceed max_backoff_ms ({})",
                self.min_backoff_ms, self.max_backoff_ms
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_backoff_ms, 50);
        assert_eq!(config.max_backoff_ms, 1000);
        assert!(config.stun_servers.is_empty());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let config = ClientConfig {
            signaling_url: "http://example.com/signal".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let config = ClientConfig {
            signaling_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_min_backoff() {
        let config = ClientConfig {
            min_backoff_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_backoff_bounds() {
        let config = ClientConfig {
            min_backoff_ms: 2_000,
            max_backoff_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_accepts_valid_config() {
        let config = ClientConfig::from_json(
            r#"{
                "signaling_url": "wss://feed.example.com/signal",
                "min_backoff_ms": 100,
                "max_backoff_ms": 2000,
                "stun_servers": ["stun:stun.example.com:3478"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.signaling_url, "wss://feed.example.com/signal");
        assert_eq!(config.stun_servers.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_malformed_json() {
        let err = ClientConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_json_validates_parsed_values() {
        let err = ClientConfig::from_json(
            r#"{
                "signaling_url": "http://feed.example.com/signal",
                "min_backoff_ms": 50,
                "max_backoff_ms": 1000,
                "stun_servers": []
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.signaling_url, config.signaling_url);
        assert_eq!(restored.min_backoff_ms, config.min_backoff_ms);
    }
}
