//! Crate-level error type.
//!
//! Only setup paths return errors: building a bridge, opening a connection
//! primitive, loading configuration. Handlers never fail; transport trouble is
//! reported as a disconnect and unknown events are logged and dropped.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while constructing or configuring a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `UpdateBridgeBuilder::build` was called without a store sink.
    #[error("a store sink is required")]
    MissingStore,

    /// The push server URL is not a `ws://` or `wss://` origin.
    #[error("invalid push server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// None of the configured transports is provided by the connection primitive.
    #[error("none of the configured transports are supported: [{offered}]")]
    UnsupportedTransports { offered: String },

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::BridgeConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config parsed but holds values the bridge cannot run with.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A push frame could not be decoded into an event envelope.
    #[error("undecodable push frame: {0}")]
    Frame(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_display() {
        assert_eq!(BridgeError::MissingStore.to_string(), "a store sink is required");
    }

    #[test]
    fn invalid_url_display_carries_url_and_reason() {
        let err = BridgeError::InvalidUrl {
            url: "http://localhost".into(),
            reason: "expected ws:// or wss://".into(),
        };
        let s = err.to_string();
        assert!(s.contains("http://localhost"), "url in display: {s}");
        assert!(s.contains("ws://"), "reason in display: {s}");
    }

    #[test]
    fn config_read_display_includes_path() {
        let err = BridgeError::ConfigRead {
            path: PathBuf::from("/etc/bridge.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let s = err.to_string();
        assert!(s.contains("/etc/bridge.toml"), "path in display: {s}");
        assert!(s.contains("gone"), "source in display: {s}");
    }

    #[test]
    fn config_read_exposes_source() {
        use std::error::Error as _;
        let err = BridgeError::ConfigRead {
            path: PathBuf::from("x.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn toml_error_converts() {
        let parse_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: BridgeError = parse_err.into();
        assert!(matches!(err, BridgeError::ConfigParse(_)));
    }
}
