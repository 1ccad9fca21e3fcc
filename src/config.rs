//! Bridge configuration, loaded from TOML.
//!
//! ```toml
//! server_url = "ws://127.0.0.1:6767"
//! base_path  = "/api/"
//! transports = ["websocket", "polling"]
//!
//! [reconnect]
//! enabled              = true
//! delay_ms             = 1000
//! delay_max_ms         = 5000
//! randomization_factor = 0.5
//! max_attempts         = 0     # 0 = keep trying
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above (except
//! `base_path`, which defaults to `/`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::transport::{default_transports, TransportKind};

/// Retry policy handed to the connection primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Delay before the first retry.
    pub delay_ms: u64,
    /// Upper bound for the exponentially growing delay.
    pub delay_max_ms: u64,
    /// Jitter as a fraction of the delay, in `[0, 1]`.
    pub randomization_factor: f64,
    /// Retries after a failure before giving up. `0` means unlimited.
    pub max_attempts: u32,
}

impl ReconnectConfig {
    /// Never retry.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn delay_max(&self) -> Duration {
        Duration::from_millis(self.delay_max_ms)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.delay_ms > self.delay_max_ms {
            return Err(BridgeError::InvalidConfig(format!(
                "reconnect.delay_ms ({}) must not exceed reconnect.delay_max_ms ({})",
                self.delay_ms, self.delay_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(BridgeError::InvalidConfig(format!(
                "reconnect.randomization_factor must be in [0, 1], got {}",
                self.randomization_factor
            )));
        }
        Ok(())
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 1_000,
            delay_max_ms: 5_000,
            randomization_factor: 0.5,
            max_attempts: 0,
        }
    }
}

/// Top-level configuration for one bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origin of the push server, e.g. `ws://127.0.0.1:6767`.
    pub server_url: String,
    /// Base path the push endpoint is mounted under. Must end where the
    /// endpoint suffix begins, e.g. `/api/`.
    pub base_path: String,
    pub transports: Vec<TransportKind>,
    pub reconnect: ReconnectConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:6767".into(),
            base_path: "/".into(),
            transports: default_transports(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(BridgeError::InvalidUrl {
                url: self.server_url.clone(),
                reason: "expected a ws:// or wss:// origin".into(),
            });
        }
        if self.transports.is_empty() {
            return Err(BridgeError::InvalidConfig("transports must not be empty".into()));
        }
        self.reconnect.validate()
    }
}
